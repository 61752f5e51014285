use std::sync::Arc;
use std::time::Duration;

use api_types::AcceleratorFunction;
use api_types::FpgaRegion;
use error_stack::Report;
use error_stack::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::lister::Lister;
use super::queue::WorkQueue;
use super::types::ControllerError;
use super::types::ObjectKey;
use super::types::ObjectKind;
use super::types::ReconciliationEvent;
use crate::patcher::DeviceFunctionDescriptor;
use crate::patcher::PatcherManager;
use crate::patcher::RegionDescriptor;

/// Drains the work queue into the patcher manager.
///
/// A key whose object is gone from the cache is treated as a deletion.
/// Failed keys are retried with backoff; errors never leave the controller.
pub struct Controller<F, R> {
    manager: Arc<PatcherManager>,
    queue: Arc<WorkQueue<ObjectKey>>,
    functions: F,
    regions: R,
}

impl<F, R> Controller<F, R>
where
    F: Lister<AcceleratorFunction>,
    R: Lister<FpgaRegion>,
{
    pub fn new(
        manager: Arc<PatcherManager>,
        queue: Arc<WorkQueue<ObjectKey>>,
        functions: F,
        regions: R,
    ) -> Self {
        Self {
            manager,
            queue,
            functions,
            regions,
        }
    }

    fn reconciliation_event(
        &self,
        key: &ObjectKey,
    ) -> Result<ReconciliationEvent, Report<ControllerError>> {
        let fetch_failed = || ControllerError::Fetch { key: key.clone() };
        let namespace = key.namespace.clone();

        let event = match key.kind {
            ObjectKind::Function => {
                match self
                    .functions
                    .get(&key.namespace, &key.name)
                    .change_context_lazy(fetch_failed)?
                {
                    Some(function) => ReconciliationEvent::FunctionApplied {
                        namespace,
                        function: DeviceFunctionDescriptor::from_resource(&function)
                            .change_context(ControllerError::Sync { key: key.clone() })?,
                    },
                    None => ReconciliationEvent::FunctionDeleted {
                        namespace,
                        name: key.name.clone(),
                    },
                }
            }
            ObjectKind::Region => {
                match self
                    .regions
                    .get(&key.namespace, &key.name)
                    .change_context_lazy(fetch_failed)?
                {
                    Some(region) => ReconciliationEvent::RegionApplied {
                        namespace,
                        region: RegionDescriptor::from_resource(&region),
                    },
                    None => ReconciliationEvent::RegionDeleted {
                        namespace,
                        name: key.name.clone(),
                    },
                }
            }
        };
        Ok(event)
    }

    /// Brings the translator in line with the cached state of `key`.
    pub fn sync(&self, key: &ObjectKey) -> Result<(), Report<ControllerError>> {
        let event = self.reconciliation_event(key)?;
        debug!(%key, ?event, "reconciling");
        self.manager
            .dispatch(event)
            .change_context_lazy(|| ControllerError::Sync { key: key.clone() })
    }

    /// Handles one queued key. Returns `false` once the queue is shut down.
    pub async fn process_next_work_item(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        match self.sync(&key) {
            Ok(()) => self.queue.forget(&key),
            Err(e) => {
                warn!(
                    %key,
                    retries = self.queue.num_requeues(&key),
                    error = ?e,
                    "reconciliation failed, requeueing"
                );
                self.queue.add_rate_limited(key.clone());
            }
        }
        self.queue.done(&key);

        true
    }

    async fn wait_for_cache_sync(&self, timeout: Duration) -> Result<(), Report<ControllerError>> {
        let synced = async {
            self.functions
                .wait_synced()
                .await
                .change_context(ControllerError::CacheSync {
                    kind: ObjectKind::Function,
                })?;
            self.regions
                .wait_synced()
                .await
                .change_context(ControllerError::CacheSync {
                    kind: ObjectKind::Region,
                })
        };

        tokio::time::timeout(timeout, synced)
            .await
            .map_err(|_| Report::new(ControllerError::CacheSyncTimeout { timeout }))?
    }

    /// Waits for both caches, then runs `workers` workers until `token` is
    /// cancelled. The queue is shut down on the way out.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::CacheSyncTimeout`] if the caches do not sync in time
    /// - [`ControllerError::CacheSync`] if a cache can no longer sync
    #[tracing::instrument(skip_all, fields(workers = workers))]
    pub async fn run(
        self: Arc<Self>,
        workers: usize,
        cache_sync_timeout: Duration,
        token: CancellationToken,
    ) -> Result<(), Report<ControllerError>> {
        info!("Waiting for caches to sync");
        tokio::select! {
            _ = token.cancelled() => {
                self.queue.shutdown();
                return Ok(());
            }
            synced = self.wait_for_cache_sync(cache_sync_timeout) => {
                if let Err(e) = synced {
                    self.queue.shutdown();
                    return Err(e);
                }
            }
        }

        info!("Caches synced, starting workers");
        let handles: Vec<_> = (0..workers.max(1))
            .map(|worker| {
                let controller = Arc::clone(&self);
                tokio::spawn(async move {
                    while controller.process_next_work_item().await {}
                    debug!(worker, "worker stopped");
                })
            })
            .collect();

        token.cancelled().await;
        info!("Shutting down workers");
        self.queue.shutdown();

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task failed");
            }
        }

        Ok(())
    }
}
