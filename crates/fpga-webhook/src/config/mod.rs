pub mod cli;
pub mod serve;

use std::time::Duration;

use crate::controller::BackoffPolicy;

/// Reconciliation settings taken from the command line.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace to watch, all namespaces when `None`.
    pub watch_namespace: Option<String>,
    pub workers: usize,
    pub queue_capacity: usize,
    pub cache_sync_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl From<&serve::ServeArgs> for ControllerConfig {
    fn from(args: &serve::ServeArgs) -> Self {
        Self {
            watch_namespace: args.watch_namespace.clone().filter(|ns| !ns.is_empty()),
            workers: args.workers.max(1),
            queue_capacity: args.queue_capacity.max(1),
            cache_sync_timeout: Duration::from_secs(args.cache_sync_timeout_secs),
            backoff: BackoffPolicy::new(
                Duration::from_millis(args.backoff_base_ms),
                Duration::from_secs(args.backoff_max_secs),
            ),
        }
    }
}

pub use cli::*;
pub use serve::*;
