//! Keeps every namespace's translator in sync with the `AcceleratorFunction`
//! and `FpgaRegion` objects in the cluster.

mod lister;
mod queue;
mod source;
mod types;
mod worker;

use std::sync::Arc;

use api_types::AcceleratorFunction;
use api_types::FpgaRegion;
use error_stack::Report;
use kube::runtime::reflector::store::Writer;
use kube::Api;
use kube::Client;
use tokio_util::sync::CancellationToken;

pub use self::lister::Lister;
pub use self::queue::BackoffPolicy;
pub use self::queue::WorkQueue;
pub use self::source::collect_keys;
pub use self::source::watch_objects;
pub use self::types::ControllerError;
pub use self::types::ObjectKey;
pub use self::types::ObjectKind;
pub use self::types::ReconciliationEvent;
pub use self::worker::Controller;
use crate::config::ControllerConfig;
use crate::patcher::PatcherManager;

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = kube::core::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

/// Watches both custom resource kinds and reconciles them into `manager`
/// until `token` is cancelled.
///
/// # Errors
///
/// - [`ControllerError::CacheSyncTimeout`] if the initial listing does not
///   complete in time
/// - [`ControllerError::WatchEnded`] if a watch stream terminates
pub async fn run(
    client: Client,
    config: ControllerConfig,
    manager: Arc<PatcherManager>,
    token: CancellationToken,
) -> Result<(), Report<ControllerError>> {
    let queue = Arc::new(WorkQueue::new(config.queue_capacity, config.backoff));
    let namespace = config.watch_namespace.as_deref();

    let function_writer = Writer::<AcceleratorFunction>::default();
    let functions = function_writer.as_reader();
    let region_writer = Writer::<FpgaRegion>::default();
    let regions = region_writer.as_reader();

    let function_watch = watch_objects(
        ObjectKind::Function,
        api(&client, namespace),
        function_writer,
        Arc::clone(&queue),
        token.clone(),
    );
    let region_watch = watch_objects(
        ObjectKind::Region,
        api(&client, namespace),
        region_writer,
        Arc::clone(&queue),
        token.clone(),
    );

    let controller = Arc::new(Controller::new(manager, Arc::clone(&queue), functions, regions));
    let workers = controller.run(config.workers, config.cache_sync_timeout, token);

    let result = tokio::try_join!(function_watch, region_watch, workers).map(|_| ());
    queue.shutdown();
    result
}
