use std::sync::Arc;

use dashmap::DashMap;
use json_patch::Patch;
use kube::core::admission::AdmissionRequest;
use kube::core::admission::AdmissionResponse;
use kube::core::DynamicObject;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::catalog::DeviceCatalog;
use super::error::PatchError;
use super::translator::Translator;
use crate::admission::PodCodec;
use crate::controller::ReconciliationEvent;

/// Holds one [`Translator`] per namespace and routes reconciliation events
/// and admission requests to it.
///
/// Translators are created on first use and never evicted.
pub struct PatcherManager {
    patchers: DashMap<String, Arc<Translator>>,
    catalog: Arc<dyn DeviceCatalog>,
    codec: PodCodec,
}

impl PatcherManager {
    pub fn new(catalog: Arc<dyn DeviceCatalog>, codec: PodCodec) -> Self {
        Self {
            patchers: DashMap::new(),
            catalog,
            codec,
        }
    }

    pub fn codec(&self) -> &PodCodec {
        &self.codec
    }

    /// Returns the namespace's translator, creating an empty one if needed.
    pub fn translator(&self, namespace: &str) -> Arc<Translator> {
        if let Some(translator) = self.patchers.get(namespace) {
            return Arc::clone(translator.value());
        }

        let translator = self
            .patchers
            .entry(namespace.to_string())
            .or_insert_with(|| {
                debug!(namespace, "created new translator");
                Arc::new(Translator::new(namespace, Arc::clone(&self.catalog)))
            });
        Arc::clone(translator.value())
    }

    /// Number of namespaces with a translator.
    pub fn namespaces(&self) -> usize {
        self.patchers.len()
    }

    /// Applies a reconciled object state to its namespace's translator.
    pub fn dispatch(&self, event: ReconciliationEvent) -> Result<(), PatchError> {
        match event {
            ReconciliationEvent::FunctionApplied {
                namespace,
                function,
            } => self.translator(&namespace).add_function(&function)?,
            ReconciliationEvent::FunctionDeleted { namespace, name } => {
                self.translator(&namespace).remove_function(&name)
            }
            ReconciliationEvent::RegionApplied { namespace, region } => {
                self.translator(&namespace).add_region(&region)
            }
            ReconciliationEvent::RegionDeleted { namespace, name } => {
                self.translator(&namespace).remove_region(&name)
            }
        }
        Ok(())
    }

    /// Decides on a pod admission request.
    ///
    /// Every container must translate cleanly for the pod to be allowed; the
    /// first failure denies the request with its message and no patch.
    pub fn mutate_pod(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        let pod = match self.codec.decode_pod(request) {
            Ok(pod) => pod,
            Err(e) => {
                warn!(uid = %request.uid, error = %e, "unable to decode pod");
                return AdmissionResponse::from(request).deny(e);
            }
        };

        let namespace = pod
            .metadata
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .or(request.namespace.as_deref())
            .unwrap_or_default();
        let name = pod
            .metadata
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(pod.metadata.generate_name.as_deref())
            .unwrap_or_default();

        let translator = self.translator(namespace);
        let containers = pod.spec.as_ref().map(|spec| spec.containers.as_slice());

        let mut ops = Vec::new();
        for (index, container) in containers.unwrap_or_default().iter().enumerate() {
            match translator.compute_patch_ops(index, container) {
                Ok(container_ops) => ops.extend(container_ops),
                Err(e) => {
                    info!(
                        namespace,
                        pod = name,
                        container = %container.name,
                        error = %e,
                        "denied pod admission"
                    );
                    return AdmissionResponse::from(request).deny(e);
                }
            }
        }

        let response = AdmissionResponse::from(request);
        if ops.is_empty() {
            return response;
        }

        debug!(namespace, pod = name, operations = ops.len(), "patching pod");
        match response.with_patch(Patch(ops)) {
            Ok(response) => response,
            Err(e) => {
                warn!(namespace, pod = name, error = %e, "unable to serialize patch");
                AdmissionResponse::from(request).deny(e)
            }
        }
    }
}
