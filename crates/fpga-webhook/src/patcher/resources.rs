use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Container;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use super::error::PatchError;
use super::quantity::ParsedQuantity;

/// A managed resource as requested by one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedResource {
    /// Keys exactly as spelled in the container, the ones to remove.
    pub keys: Vec<String>,
    pub quantity: i64,
}

fn parse(resource: &str, quantity: &Quantity) -> Result<ParsedQuantity, PatchError> {
    quantity.0.parse().map_err(|_| PatchError::InvalidQuantity {
        resource: resource.to_string(),
        value: quantity.0.clone(),
    })
}

fn check_equal(
    resource: &str,
    quantity: &Quantity,
    other: Option<&Quantity>,
) -> Result<ParsedQuantity, PatchError> {
    let parsed = parse(resource, quantity)?;
    let overcommitted = || PatchError::Overcommitted {
        resource: resource.to_string(),
    };
    let other = other.ok_or_else(overcommitted)?;
    if parse(resource, other)? != parsed {
        return Err(overcommitted());
    }
    Ok(parsed)
}

/// Collects the resources under `prefix` a container asks for, keyed by
/// their lower-cased name.
///
/// Every such resource must appear in both `limits` and `requests` with the
/// same non-negative whole-number quantity. Requests are checked first since a container
/// may carry requests without limits.
pub fn requested_resources(
    container: &Container,
    prefix: &str,
) -> Result<BTreeMap<String, RequestedResource>, PatchError> {
    let empty = BTreeMap::new();
    let resources = container.resources.as_ref();
    let limits = resources.and_then(|r| r.limits.as_ref()).unwrap_or(&empty);
    let requests = resources.and_then(|r| r.requests.as_ref()).unwrap_or(&empty);

    let managed = |name: &String| {
        let lower = name.to_lowercase();
        lower.starts_with(prefix).then_some(lower)
    };

    for (name, quantity) in requests {
        if let Some(resource) = managed(name) {
            check_equal(&resource, quantity, limits.get(name))?;
        }
    }

    let mut requested: BTreeMap<String, RequestedResource> = BTreeMap::new();
    for (name, quantity) in limits {
        let Some(resource) = managed(name) else {
            continue;
        };

        let parsed = check_equal(&resource, quantity, requests.get(name))?;
        let count = parsed
            .to_integer()
            .ok_or_else(|| PatchError::NonIntegralQuantity {
                resource: resource.clone(),
            })?;
        if count < 0 {
            return Err(PatchError::NegativeQuantity {
                resource,
                value: quantity.0.clone(),
            });
        }

        let entry = requested.entry(resource).or_insert_with(|| RequestedResource {
            keys: Vec::new(),
            quantity: 0,
        });
        entry.keys.push(name.clone());
        entry.quantity = entry.quantity.saturating_add(count);
    }

    Ok(requested)
}
