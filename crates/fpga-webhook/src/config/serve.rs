use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[arg(
        long,
        env = "WEBHOOK_LISTEN_ADDR",
        default_value = "0.0.0.0:8443",
        help = "Address the admission endpoint listens on"
    )]
    pub listen_addr: String,

    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        env = "WATCH_NAMESPACE",
        help = "Namespace to watch for AcceleratorFunction and FpgaRegion objects (empty for all namespaces)"
    )]
    pub watch_namespace: Option<String>,

    #[arg(
        long,
        env = "CONTROLLER_WORKERS",
        default_value = "2",
        help = "Number of reconciliation workers"
    )]
    pub workers: usize,

    #[arg(
        long,
        default_value = "1024",
        help = "Maximum number of objects waiting for reconciliation"
    )]
    pub queue_capacity: usize,

    #[arg(
        long,
        default_value = "60",
        help = "Seconds to wait for the initial object listing before giving up"
    )]
    pub cache_sync_timeout_secs: u64,

    #[arg(
        long,
        default_value = "5",
        help = "Initial retry delay in milliseconds for failed reconciliations"
    )]
    pub backoff_base_ms: u64,

    #[arg(
        long,
        default_value = "1000",
        help = "Upper bound in seconds for the retry delay of failed reconciliations"
    )]
    pub backoff_max_secs: u64,

    #[arg(
        long,
        default_value = "30",
        help = "Seconds to wait for tasks to stop after a shutdown signal"
    )]
    pub shutdown_timeout_secs: u64,
}

impl ServeArgs {
    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_timeout_secs)
    }
}
