use std::time::Duration;

use kube::Resource;
use kube::ResourceExt;

use crate::patcher::DeviceFunctionDescriptor;
use crate::patcher::RegionDescriptor;

/// The custom resource kinds the controller reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ObjectKind {
    #[display("AcceleratorFunction")]
    Function,
    #[display("FpgaRegion")]
    Region,
}

/// Identifies one watched object; the unit of work of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{kind}/{namespace}/{name}")]
pub struct ObjectKey {
    pub kind: ObjectKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: ObjectKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn for_object<K: Resource>(kind: ObjectKind, object: &K) -> Self {
        Self::new(kind, object.namespace().unwrap_or_default(), object.name_any())
    }
}

/// The reconciled state of one object, as handed to the patcher manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationEvent {
    FunctionApplied {
        namespace: String,
        function: DeviceFunctionDescriptor,
    },
    FunctionDeleted {
        namespace: String,
        name: String,
    },
    RegionApplied {
        namespace: String,
        region: RegionDescriptor,
    },
    RegionDeleted {
        namespace: String,
        name: String,
    },
}

#[derive(Debug, derive_more::Display)]
pub enum ControllerError {
    #[display("Cache of {kind} objects failed to sync")]
    CacheSync { kind: ObjectKind },
    #[display("Caches did not sync within {timeout:?}")]
    CacheSyncTimeout { timeout: Duration },
    #[display("Object cache closed before it was populated")]
    StoreClosed,
    #[display("Failed to look up {key}")]
    Fetch { key: ObjectKey },
    #[display("Failed to reconcile {key}")]
    Sync { key: ObjectKey },
    #[display("Watch stream of {kind} objects ended")]
    WatchEnded { kind: ObjectKind },
}

impl core::error::Error for ControllerError {}
