use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use error_stack::Report;
use futures::StreamExt;
use kube::runtime::reflector;
use kube::runtime::reflector::store::Writer;
use kube::runtime::watcher;
use kube::runtime::WatchStreamExt;
use kube::Api;
use kube::Resource;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::queue::WorkQueue;
use super::types::ControllerError;
use super::types::ObjectKey;
use super::types::ObjectKind;

/// Translates a watch event into the keys that need reconciling.
///
/// `known` tracks the keys seen so far; on a re-list, keys that vanished
/// while the watch was down are returned as well so their deletion is not
/// missed.
pub fn collect_keys<K: Resource>(
    kind: ObjectKind,
    event: &watcher::Event<K>,
    known: &mut HashSet<ObjectKey>,
) -> Vec<ObjectKey> {
    match event {
        watcher::Event::Applied(object) => {
            let key = ObjectKey::for_object(kind, object);
            known.insert(key.clone());
            vec![key]
        }
        watcher::Event::Deleted(object) => {
            let key = ObjectKey::for_object(kind, object);
            known.remove(&key);
            vec![key]
        }
        watcher::Event::Restarted(objects) => {
            let listed: HashSet<ObjectKey> = objects
                .iter()
                .map(|object| ObjectKey::for_object(kind, object))
                .collect();
            let mut keys: Vec<ObjectKey> = listed.union(known).cloned().collect();
            keys.sort();
            *known = listed;
            keys
        }
    }
}

/// Keeps the cache behind `writer` in sync with the API server and queues
/// the key of every object that changes, until `token` is cancelled.
#[tracing::instrument(skip_all, fields(kind = %kind))]
pub async fn watch_objects<K>(
    kind: ObjectKind,
    api: Api<K>,
    writer: Writer<K>,
    queue: Arc<WorkQueue<ObjectKey>>,
    token: CancellationToken,
) -> Result<(), Report<ControllerError>>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Eq + std::hash::Hash + Clone + Default + Send + Sync,
{
    info!("Starting watch");

    let stream = reflector(writer, watcher(api, watcher::Config::default())).default_backoff();
    let mut stream = std::pin::pin!(stream);
    let mut known = HashSet::new();

    loop {
        let event = tokio::select! {
            _ = token.cancelled() => {
                info!("Watch stopped");
                return Ok(());
            }
            event = stream.next() => event,
        };

        match event {
            Some(Ok(event)) => {
                for key in collect_keys(kind, &event, &mut known) {
                    debug!(%key, "queueing");
                    queue.add(key).await;
                }
            }
            Some(Err(e)) => {
                // The stream backs off and re-lists by itself.
                warn!(error = %e, "watch error");
            }
            None => return Err(Report::new(ControllerError::WatchEnded { kind })),
        }
    }
}
