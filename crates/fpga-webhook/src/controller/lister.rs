use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use error_stack::Report;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::reflector::Store;
use kube::Resource;

use super::types::ControllerError;

/// Read access to a local cache of objects.
pub trait Lister<K>: Send + Sync + 'static {
    /// Looks an object up by namespace and name. `Ok(None)` means it no
    /// longer exists.
    fn get(&self, namespace: &str, name: &str) -> Result<Option<Arc<K>>, Report<ControllerError>>;

    /// Resolves once the cache holds a complete initial listing.
    fn wait_synced(&self) -> impl Future<Output = Result<(), Report<ControllerError>>> + Send;
}

impl<K> Lister<K> for Store<K>
where
    K: Resource + Clone + Send + Sync + 'static,
    K::DynamicType: Eq + Hash + Clone + Default + Send + Sync,
{
    fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Arc<K>>, Report<ControllerError>> {
        Ok(Store::get(self, &ObjectRef::new(name).within(namespace)))
    }

    async fn wait_synced(&self) -> Result<(), Report<ControllerError>> {
        self.wait_until_ready().await.map_err(|e| {
            Report::new(ControllerError::StoreClosed).attach_printable(format!("{e:?}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use api_types::FpgaRegion;
    use api_types::FpgaRegionSpec;
    use kube::runtime::reflector::store::Writer;
    use kube::runtime::watcher;

    use super::*;

    fn region(namespace: &str, name: &str) -> FpgaRegion {
        let mut region = FpgaRegion::new(
            name,
            FpgaRegionSpec {
                interface_id: "ce48969398f05f33946d560708be108a".to_string(),
            },
        );
        region.metadata.namespace = Some(namespace.to_string());
        region
    }

    #[tokio::test]
    async fn store_lists_objects_by_namespace_and_name() {
        let mut writer = Writer::<FpgaRegion>::default();
        let store = writer.as_reader();
        writer.apply_watcher_event(&watcher::Event::Restarted(vec![region("default", "arria10")]));

        store.wait_synced().await.expect("store is ready");

        let found = Lister::get(&store, "default", "arria10").expect("lookup");
        assert_eq!(
            found.map(|r| r.spec.interface_id.clone()).as_deref(),
            Some("ce48969398f05f33946d560708be108a")
        );
        assert!(Lister::get(&store, "other", "arria10").expect("lookup").is_none());
    }

    #[tokio::test]
    async fn dropped_writer_fails_sync() {
        let writer = Writer::<FpgaRegion>::default();
        let store = writer.as_reader();
        drop(writer);

        assert!(store.wait_synced().await.is_err());
    }
}
