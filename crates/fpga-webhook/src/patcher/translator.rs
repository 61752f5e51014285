use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use api_types::AcceleratorFunction;
use api_types::FpgaRegion;
use api_types::Mode;
use api_types::UnknownModeError;
use json_patch::AddOperation;
use json_patch::PatchOperation;
use json_patch::RemoveOperation;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::EnvVar;
use kube::ResourceExt;
use serde_json::Value;

use super::canonical::canonize_id;
use super::catalog::DeviceCatalog;
use super::error::PatchError;
use super::resources::requested_resources;

/// Prefix of every resource name the translator manages.
pub const RESOURCE_PREFIX: &str = "fpga.intel.com/";

const RESERVED_ENV_PREFIXES: [&str; 2] = ["FPGA_REGION", "FPGA_AFU"];

/// Upper bound on region-mode units one container may request. Each unit
/// becomes a pair of environment variables.
pub const MAX_REGION_UNITS: i64 = 64;

/// Escapes a JSON pointer segment (RFC 6901).
pub fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn generic_name(name: &str) -> String {
    format!("{RESOURCE_PREFIX}{name}")
}

fn region_resource(interface_id: &str) -> String {
    format!("{RESOURCE_PREFIX}region-{interface_id}")
}

/// A device function as registered by an `AcceleratorFunction` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFunctionDescriptor {
    pub name: String,
    pub afu_id: String,
    pub interface_id: String,
    pub mode: Mode,
}

impl DeviceFunctionDescriptor {
    /// Builds a descriptor with both identifiers canonicalized.
    pub fn new(name: impl Into<String>, afu_id: &str, interface_id: &str, mode: Mode) -> Self {
        Self {
            name: name.into(),
            afu_id: canonize_id(afu_id),
            interface_id: canonize_id(interface_id),
            mode,
        }
    }

    pub fn from_resource(function: &AcceleratorFunction) -> Result<Self, UnknownModeError> {
        Ok(Self::new(
            function.name_any(),
            &function.spec.afu_id,
            &function.spec.interface_id,
            function.spec.parsed_mode()?,
        ))
    }
}

/// A region type as registered by an `FpgaRegion` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDescriptor {
    pub name: String,
    pub interface_id: String,
}

impl RegionDescriptor {
    pub fn new(name: impl Into<String>, interface_id: &str) -> Self {
        Self {
            name: name.into(),
            interface_id: canonize_id(interface_id),
        }
    }

    pub fn from_resource(region: &FpgaRegion) -> Self {
        Self::new(region.name_any(), &region.spec.interface_id)
    }
}

/// Mappings keyed by generic resource name. `concrete_names` and `modes`
/// always share one key set; `identities` holds the region-mode subset.
#[derive(Debug, Default)]
struct TranslationTable {
    identities: HashMap<String, DeviceFunctionDescriptor>,
    concrete_names: HashMap<String, String>,
    modes: HashMap<String, Mode>,
}

impl TranslationTable {
    fn remove(&mut self, generic: &str) {
        self.identities.remove(generic);
        self.concrete_names.remove(generic);
        self.modes.remove(generic);
    }
}

/// Translates generic FPGA resource requests of one namespace into the
/// resources device plugins actually advertise.
///
/// All reads and writes of the table happen under one lock, so a patch is
/// always computed against a consistent snapshot.
pub struct Translator {
    namespace: String,
    table: Mutex<TranslationTable>,
    catalog: Arc<dyn DeviceCatalog>,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("namespace", &self.namespace)
            .field("resources", &self.len())
            .finish()
    }
}

impl Translator {
    pub fn new(namespace: impl Into<String>, catalog: Arc<dyn DeviceCatalog>) -> Self {
        Self {
            namespace: namespace.into(),
            table: Mutex::new(TranslationTable::default()),
            catalog,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    // The table stays consistent even if a holder panicked: every mutation
    // is a handful of infallible map operations.
    fn lock(&self) -> MutexGuard<'_, TranslationTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers or updates a device function.
    ///
    /// For `af` mode the concrete resource comes from the device catalog;
    /// when that lookup fails nothing is stored.
    pub fn add_function(&self, function: &DeviceFunctionDescriptor) -> Result<(), PatchError> {
        let generic = generic_name(&function.name);
        let concrete = match function.mode {
            Mode::Af => {
                let devtype = self
                    .catalog
                    .device_type(&function.interface_id, &function.afu_id)?;
                format!("{RESOURCE_PREFIX}{devtype}")
            }
            Mode::Region | Mode::RegionDevel => region_resource(&function.interface_id),
        };

        let mut table = self.lock();
        if function.mode == Mode::Region {
            table.identities.insert(generic.clone(), function.clone());
        } else {
            table.identities.remove(&generic);
        }
        table
            .concrete_names
            .insert(generic.clone(), escape_pointer(&concrete));
        table.modes.insert(generic, function.mode);

        Ok(())
    }

    /// Registers or updates a region; regions are always consumed in
    /// `regiondevel` mode.
    pub fn add_region(&self, region: &RegionDescriptor) {
        let generic = generic_name(&region.name);
        let concrete = escape_pointer(&region_resource(&region.interface_id));

        let mut table = self.lock();
        table.identities.remove(&generic);
        table.concrete_names.insert(generic.clone(), concrete);
        table.modes.insert(generic, Mode::RegionDevel);
    }

    pub fn remove_function(&self, name: &str) {
        self.lock().remove(&generic_name(name));
    }

    pub fn remove_region(&self, name: &str) {
        self.lock().remove(&generic_name(name));
    }

    /// Computes the JSON patch operations rewriting the container at
    /// `container_index`.
    ///
    /// Operations come in a fixed order: removals of the generic resources,
    /// additions of the concrete ones, then the environment list when
    /// region-mode resources need programming hints. Any error discards the
    /// whole computation.
    ///
    /// The table lock covers only the lookups; environment entries are
    /// expanded afterwards from a copy, and at most [`MAX_REGION_UNITS`]
    /// region units are accepted per container.
    pub fn compute_patch_ops(
        &self,
        container_index: usize,
        container: &Container,
    ) -> Result<Vec<PatchOperation>, PatchError> {
        let env = container.env.as_deref().unwrap_or_default();
        if let Some(var) = env.iter().find(|var| {
            RESERVED_ENV_PREFIXES
                .iter()
                .any(|prefix| var.name.starts_with(prefix))
        }) {
            return Err(PatchError::ReservedEnvVar {
                name: var.name.clone(),
            });
        }

        let requested = requested_resources(container, RESOURCE_PREFIX)?;
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let resources_path = format!("/spec/containers/{container_index}/resources");
        let mut ops = Vec::with_capacity(4 * requested.len() + 1);
        let mut merged: BTreeMap<String, i64> = BTreeMap::new();
        // (units, interface id, afu id) per region-mode resource, in order.
        let mut region_units: Vec<(i64, String, String)> = Vec::new();

        {
            let table = self.lock();
            let mut container_mode = None;

            for (resource, request) in &requested {
                let no_such_resource = || PatchError::NoSuchResource {
                    resource: resource.clone(),
                };
                let mode = *table.modes.get(resource).ok_or_else(no_such_resource)?;
                match container_mode {
                    None => container_mode = Some(mode),
                    Some(seen) if seen != mode => return Err(PatchError::IncompatibleModes),
                    Some(_) => {}
                }

                if mode == Mode::Region {
                    let function = table.identities.get(resource).ok_or_else(no_such_resource)?;
                    region_units.push((
                        request.quantity,
                        function.interface_id.clone(),
                        function.afu_id.clone(),
                    ));
                }

                let concrete = table
                    .concrete_names
                    .get(resource)
                    .ok_or_else(no_such_resource)?;
                let total = merged.entry(concrete.clone()).or_default();
                *total = total.saturating_add(request.quantity);

                for key in &request.keys {
                    for section in ["limits", "requests"] {
                        ops.push(PatchOperation::Remove(RemoveOperation {
                            path: format!("{resources_path}/{section}/{}", escape_pointer(key)),
                        }));
                    }
                }
            }
        }

        let requested_units = region_units
            .iter()
            .fold(0_i64, |total, (units, ..)| total.saturating_add(*units));
        if requested_units > MAX_REGION_UNITS {
            return Err(PatchError::TooManyRegionUnits {
                requested: requested_units,
                limit: MAX_REGION_UNITS,
            });
        }

        let mut generated = Vec::new();
        for (units, interface_id, afu_id) in &region_units {
            for _ in 0..*units {
                let counter = generated.len() / 2 + 1;
                generated.push(plain_env(format!("FPGA_REGION_{counter}"), interface_id));
                generated.push(plain_env(format!("FPGA_AFU_{counter}"), afu_id));
            }
        }

        for (concrete, quantity) in merged {
            for section in ["limits", "requests"] {
                ops.push(PatchOperation::Add(AddOperation {
                    path: format!("{resources_path}/{section}/{concrete}"),
                    value: Value::String(quantity.to_string()),
                }));
            }
        }

        if !generated.is_empty() {
            let entries: Vec<EnvVar> = env.iter().cloned().chain(generated).collect();
            let value = serde_json::to_value(entries).map_err(|e| PatchError::Serialization {
                reason: e.to_string(),
            })?;
            ops.push(PatchOperation::Add(AddOperation {
                path: format!("/spec/containers/{container_index}/env"),
                value,
            }));
        }

        Ok(ops)
    }

    /// Number of registered generic resource names.
    pub fn len(&self) -> usize {
        self.lock().modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries carrying per-unit programming metadata.
    pub fn identities_len(&self) -> usize {
        self.lock().identities.len()
    }

    pub fn concrete_names_len(&self) -> usize {
        self.lock().concrete_names.len()
    }

    /// Concrete resource a generic name currently maps to, escaped for use
    /// in a JSON pointer.
    pub fn concrete_name(&self, generic: &str) -> Option<String> {
        self.lock().concrete_names.get(generic).cloned()
    }
}

fn plain_env(name: String, value: &str) -> EnvVar {
    EnvVar {
        name,
        value: Some(value.to_string()),
        value_from: None,
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::EnvVarSource;
    use k8s_openapi::api::core::v1::ObjectFieldSelector;
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::super::catalog::AfuDevTypeCatalog;
    use super::super::resources::tests::container_with;
    use super::*;

    const INTERFACE_ID: &str = "ce48969398f05f33946d560708be108a";
    const AFU_ID: &str = "d8424dc4a4a3c413f89e433683f9040b";

    fn translator() -> Translator {
        Translator::new("default", Arc::new(AfuDevTypeCatalog))
    }

    fn function(name: &str, mode: Mode) -> DeviceFunctionDescriptor {
        DeviceFunctionDescriptor::new(name, AFU_ID, INTERFACE_ID, mode)
    }

    fn to_json(ops: &[PatchOperation]) -> Value {
        serde_json::to_value(ops).expect("serializable ops")
    }

    #[test]
    fn descriptors_canonicalize_identifiers() {
        let function = DeviceFunctionDescriptor::new(
            "arria10-nlb0",
            "D8424DC4-A4A3-C413-F89E-433683F9040B",
            " CE48969398F05F33946D560708BE108A ",
            Mode::Region,
        );
        assert_eq!(function.afu_id, AFU_ID);
        assert_eq!(function.interface_id, INTERFACE_ID);

        let region = RegionDescriptor::new("arria10", "CE48-9693-98F0-5F33-946D-5607-08BE-108A");
        assert_eq!(region.interface_id, INTERFACE_ID);
    }

    #[test]
    fn add_then_remove_function_restores_sizes() {
        let translator = translator();

        translator
            .add_function(&function("arria10-nlb0", Mode::Region))
            .expect("region mode needs no catalog lookup");
        assert_eq!(translator.len(), 1);
        assert_eq!(translator.identities_len(), 1);

        translator.remove_function("arria10-nlb0");
        assert!(translator.is_empty());
        assert_eq!(translator.identities_len(), 0);
        assert_eq!(translator.concrete_names_len(), 0);

        // Removing an absent name is a no-op.
        translator.remove_function("arria10-nlb0");
        translator.remove_region("never-added");
        assert!(translator.is_empty());
    }

    #[test]
    fn af_mode_uses_catalog_device_type() {
        let translator = translator();

        translator
            .add_function(&function("arria10-nlb0", Mode::Af))
            .expect("valid ids");

        assert_eq!(
            translator.concrete_name("fpga.intel.com/arria10-nlb0").as_deref(),
            Some("fpga.intel.com~1af-ce4.d84.zkiWk5jwXzOUbVYHCL4QithCTcSko8QT-J5DNoP5BAs")
        );
        assert_eq!(translator.identities_len(), 0);
    }

    #[test]
    fn failed_catalog_lookup_stores_nothing() {
        let translator = translator();
        let broken = DeviceFunctionDescriptor::new("broken", "zz", "yy", Mode::Af);

        let err = translator.add_function(&broken).unwrap_err();

        assert!(matches!(err, PatchError::Catalog(_)));
        assert!(translator.is_empty());
    }

    #[test]
    fn failed_update_keeps_previous_mapping() {
        let translator = translator();
        translator
            .add_function(&function("nlb0", Mode::Region))
            .expect("region mode");

        let broken = DeviceFunctionDescriptor::new("nlb0", "zz", "yy", Mode::Af);
        assert!(translator.add_function(&broken).is_err());

        assert_eq!(
            translator.concrete_name("fpga.intel.com/nlb0").as_deref(),
            Some("fpga.intel.com~1region-ce48969398f05f33946d560708be108a")
        );
    }

    #[test]
    fn switching_away_from_region_mode_drops_identity() {
        let translator = translator();
        translator
            .add_function(&function("nlb0", Mode::Region))
            .expect("region mode");
        translator
            .add_function(&function("nlb0", Mode::RegionDevel))
            .expect("regiondevel mode");

        assert_eq!(translator.len(), 1);
        assert_eq!(translator.identities_len(), 0);
    }

    #[test]
    fn region_aliases_count_separately() {
        let translator = translator();
        translator.add_region(&RegionDescriptor::new("arria10", INTERFACE_ID));
        translator.add_region(&RegionDescriptor::new("arria10-alias", INTERFACE_ID));

        assert_eq!(translator.len(), 2);
        assert_eq!(translator.concrete_names_len(), 2);
        assert_eq!(
            translator.concrete_name("fpga.intel.com/arria10"),
            translator.concrete_name("fpga.intel.com/arria10-alias")
        );

        translator.remove_region("arria10-alias");
        assert_eq!(translator.len(), 1);
    }

    #[test]
    fn region_mode_request_adds_programming_env() {
        let translator = translator();
        translator
            .add_function(&function("arria10-nlb0", Mode::Region))
            .expect("region mode");
        let container = container_with(
            &[("fpga.intel.com/arria10-nlb0", "1")],
            &[("fpga.intel.com/arria10-nlb0", "1")],
        );

        let ops = translator
            .compute_patch_ops(0, &container)
            .expect("patchable container");

        assert_eq!(
            to_json(&ops),
            json!([
                { "op": "remove", "path": "/spec/containers/0/resources/limits/fpga.intel.com~1arria10-nlb0" },
                { "op": "remove", "path": "/spec/containers/0/resources/requests/fpga.intel.com~1arria10-nlb0" },
                {
                    "op": "add",
                    "path": "/spec/containers/0/resources/limits/fpga.intel.com~1region-ce48969398f05f33946d560708be108a",
                    "value": "1"
                },
                {
                    "op": "add",
                    "path": "/spec/containers/0/resources/requests/fpga.intel.com~1region-ce48969398f05f33946d560708be108a",
                    "value": "1"
                },
                {
                    "op": "add",
                    "path": "/spec/containers/0/env",
                    "value": [
                        { "name": "FPGA_REGION_1", "value": INTERFACE_ID },
                        { "name": "FPGA_AFU_1", "value": AFU_ID }
                    ]
                }
            ])
        );
    }

    #[test]
    fn aliased_region_functions_merge_quantities() {
        let translator = translator();
        translator
            .add_function(&function("arria10-nlb0", Mode::Region))
            .expect("region mode");
        translator
            .add_function(&function("arria10-nlb0-alias", Mode::Region))
            .expect("region mode");

        let mut container = container_with(
            &[
                ("fpga.intel.com/arria10-nlb0", "1"),
                ("fpga.intel.com/arria10-nlb0-alias", "2"),
            ],
            &[
                ("fpga.intel.com/arria10-nlb0", "1"),
                ("fpga.intel.com/arria10-nlb0-alias", "2"),
            ],
        );
        container.env = Some(vec![EnvVar {
            name: "SOME_VAR".to_string(),
            value: Some("some value".to_string()),
            value_from: None,
        }]);

        let ops = translator
            .compute_patch_ops(1, &container)
            .expect("patchable container");

        // 4 removals, one merged resource added to limits and requests, env.
        assert_eq!(ops.len(), 7);
        let json = to_json(&ops);
        assert_eq!(json[4]["value"], json!("3"));
        assert_eq!(json[5]["path"], json!("/spec/containers/1/resources/requests/fpga.intel.com~1region-ce48969398f05f33946d560708be108a"));
        let env = json[6]["value"].as_array().expect("env list");
        assert_eq!(env.len(), 7);
        assert_eq!(env[0], json!({ "name": "SOME_VAR", "value": "some value" }));
        assert_eq!(env[5], json!({ "name": "FPGA_REGION_3", "value": INTERFACE_ID }));
        assert_eq!(env[6], json!({ "name": "FPGA_AFU_3", "value": AFU_ID }));
    }

    #[test]
    fn mixed_case_keys_are_removed_as_spelled() {
        let translator = translator();
        translator.add_region(&RegionDescriptor::new("arria10", INTERFACE_ID));
        let container = container_with(
            &[("FPGA.intel.com/Arria10", "1")],
            &[("FPGA.intel.com/Arria10", "1")],
        );

        let ops = translator
            .compute_patch_ops(0, &container)
            .expect("patchable container");

        assert_eq!(ops.len(), 4);
        assert_eq!(
            to_json(&ops)[0]["path"],
            json!("/spec/containers/0/resources/limits/FPGA.intel.com~1Arria10")
        );
    }

    #[test]
    fn af_and_regiondevel_modes_only_rename() {
        for mode in [Mode::Af, Mode::RegionDevel] {
            let translator = translator();
            translator.add_function(&function("nlb0", mode)).expect("valid function");
            let container = container_with(
                &[("fpga.intel.com/nlb0", "2")],
                &[("fpga.intel.com/nlb0", "2")],
            );

            let ops = translator
                .compute_patch_ops(0, &container)
                .expect("patchable container");

            assert_eq!(ops.len(), 4, "mode {mode}");
            assert_eq!(to_json(&ops)[3]["value"], json!("2"));
        }
    }

    #[test]
    fn existing_env_sources_are_carried_over() {
        let translator = translator();
        translator
            .add_function(&function("nlb0", Mode::Region))
            .expect("region mode");
        let mut container = container_with(
            &[("fpga.intel.com/nlb0", "1")],
            &[("fpga.intel.com/nlb0", "1")],
        );
        container.env = Some(vec![EnvVar {
            name: "NODE".to_string(),
            value: None,
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "spec.nodeName".to_string(),
                    api_version: None,
                }),
                ..Default::default()
            }),
        }]);

        let ops = translator
            .compute_patch_ops(0, &container)
            .expect("patchable container");

        assert_eq!(
            to_json(&ops)[4]["value"][0],
            json!({ "name": "NODE", "valueFrom": { "fieldRef": { "fieldPath": "spec.nodeName" } } })
        );
    }

    #[test]
    fn reserved_env_var_is_rejected() {
        let translator = translator();
        translator
            .add_function(&function("arria10-nlb0", Mode::Region))
            .expect("region mode");
        let mut container = container_with(
            &[("fpga.intel.com/arria10-nlb0", "1")],
            &[("fpga.intel.com/arria10-nlb0", "1")],
        );
        container.env = Some(vec![EnvVar {
            name: "FPGA_REGION".to_string(),
            value: Some("x".to_string()),
            value_from: None,
        }]);

        let err = translator.compute_patch_ops(0, &container).unwrap_err();

        assert_eq!(err.to_string(), "environment variable 'FPGA_REGION' is not allowed");
    }

    #[test]
    fn incompatible_modes_are_rejected() {
        let translator = translator();
        translator
            .add_function(&function("arria10-nlb0", Mode::Region))
            .expect("region mode");
        translator
            .add_function(&function("arria10-nlb3", Mode::Af))
            .expect("af mode");
        let container = container_with(
            &[("fpga.intel.com/arria10-nlb0", "1"), ("fpga.intel.com/arria10-nlb3", "1")],
            &[("fpga.intel.com/arria10-nlb0", "1"), ("fpga.intel.com/arria10-nlb3", "1")],
        );

        let err = translator.compute_patch_ops(0, &container).unwrap_err();

        assert_eq!(err, PatchError::IncompatibleModes);
        assert_eq!(
            err.to_string(),
            "resources require incompatible modes in one container"
        );
    }

    #[test]
    fn region_and_regiondevel_do_not_mix() {
        let translator = translator();
        translator
            .add_function(&function("nlb0", Mode::Region))
            .expect("region mode");
        translator.add_region(&RegionDescriptor::new("arria10", INTERFACE_ID));
        let container = container_with(
            &[("fpga.intel.com/nlb0", "1"), ("fpga.intel.com/arria10", "1")],
            &[("fpga.intel.com/nlb0", "1"), ("fpga.intel.com/arria10", "1")],
        );

        let err = translator.compute_patch_ops(0, &container).unwrap_err();

        assert_eq!(err, PatchError::IncompatibleModes);
    }

    #[test]
    fn region_units_up_to_the_limit_are_expanded() {
        let translator = translator();
        translator
            .add_function(&function("nlb0", Mode::Region))
            .expect("region mode");
        translator
            .add_function(&function("nlb0-alias", Mode::Region))
            .expect("region mode");
        let half = (MAX_REGION_UNITS / 2).to_string();
        let requested = [
            ("fpga.intel.com/nlb0", half.as_str()),
            ("fpga.intel.com/nlb0-alias", half.as_str()),
        ];
        let container = container_with(&requested, &requested);

        let ops = translator
            .compute_patch_ops(0, &container)
            .expect("patchable container");

        let json = to_json(&ops);
        let env = json[6]["value"].as_array().expect("env list");
        assert_eq!(env.len(), 2 * MAX_REGION_UNITS as usize);
        assert_eq!(
            env[env.len() - 1]["name"],
            json!(format!("FPGA_AFU_{MAX_REGION_UNITS}"))
        );
    }

    #[test]
    fn region_units_beyond_the_limit_are_rejected() {
        let translator = translator();
        translator
            .add_function(&function("nlb0", Mode::Region))
            .expect("region mode");
        translator
            .add_function(&function("nlb0-alias", Mode::Region))
            .expect("region mode");
        let requested = [
            ("fpga.intel.com/nlb0", "1"),
            ("fpga.intel.com/nlb0-alias", "64"),
        ];
        let container = container_with(&requested, &requested);

        assert_eq!(
            translator.compute_patch_ops(0, &container).unwrap_err(),
            PatchError::TooManyRegionUnits {
                requested: 65,
                limit: MAX_REGION_UNITS,
            }
        );

        let huge = container_with(&[("fpga.intel.com/nlb0", "1T")], &[("fpga.intel.com/nlb0", "1T")]);
        let err = translator.compute_patch_ops(0, &huge).unwrap_err();
        assert_eq!(
            err.to_string(),
            "1000000000000 FPGA region units requested, at most 64 fit in one container"
        );
        assert_eq!(translator.len(), 2);
    }

    #[test]
    fn patches_see_consistent_snapshots_under_concurrent_updates() {
        let translator = translator();
        let container = container_with(&[("fpga.intel.com/nlb0", "1")], &[("fpga.intel.com/nlb0", "1")]);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..500 {
                    translator
                        .add_function(&function("nlb0", Mode::Region))
                        .expect("region mode");
                    translator.remove_function("nlb0");
                }
            });
            scope.spawn(|| {
                for _ in 0..500 {
                    translator.add_region(&RegionDescriptor::new("unrelated", INTERFACE_ID));
                    translator.remove_region("unrelated");
                }
            });

            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        match translator.compute_patch_ops(0, &container) {
                            Ok(ops) => assert_eq!(ops.len(), 5, "partial patch: {ops:?}"),
                            Err(err) => assert_eq!(
                                err,
                                PatchError::NoSuchResource {
                                    resource: "fpga.intel.com/nlb0".to_string()
                                }
                            ),
                        }
                    }
                });
            }
        });

        assert_eq!(translator.len(), 0);
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let translator = translator();
        let container = container_with(
            &[("fpga.intel.com/unregistered", "1")],
            &[("fpga.intel.com/unregistered", "1")],
        );

        let err = translator.compute_patch_ops(0, &container).unwrap_err();

        assert_eq!(err.to_string(), r#"no such resource: "fpga.intel.com/unregistered""#);
    }

    #[test]
    fn overcommitted_request_is_rejected() {
        let translator = translator();
        translator
            .add_function(&function("arria10-nlb0", Mode::Region))
            .expect("region mode");
        let container = container_with(&[("fpga.intel.com/arria10-nlb0", "2")], &[]);

        assert!(matches!(
            translator.compute_patch_ops(0, &container),
            Err(PatchError::Overcommitted { .. })
        ));
    }

    #[test]
    fn container_without_managed_resources_needs_no_patch() {
        let translator = translator();
        let container = container_with(&[("cpu", "1")], &[("cpu", "1")]);

        let ops = translator
            .compute_patch_ops(0, &container)
            .expect("nothing to patch");

        assert!(ops.is_empty());
    }

    #[test]
    fn patches_are_deterministic() {
        let translator = translator();
        for name in ["b", "a", "c"] {
            translator.add_region(&RegionDescriptor::new(name, &format!("{INTERFACE_ID}{name}")));
        }
        let requested = [
            ("fpga.intel.com/c", "1"),
            ("fpga.intel.com/a", "1"),
            ("fpga.intel.com/b", "1"),
        ];
        let container = container_with(&requested, &requested);

        let first = to_json(&translator.compute_patch_ops(0, &container).expect("ops"));
        let second = to_json(&translator.compute_patch_ops(0, &container).expect("ops"));

        assert_eq!(first, second);
        assert_eq!(
            first[0]["path"],
            json!("/spec/containers/0/resources/limits/fpga.intel.com~1a")
        );
    }

    #[test]
    fn pointer_escaping() {
        assert_eq!(escape_pointer("fpga.intel.com/a~b"), "fpga.intel.com~1a~0b");
    }

    #[test]
    fn resource_prefix_matches_api_group() {
        assert_eq!(RESOURCE_PREFIX, format!("{}/", api_types::GROUP));
    }
}
