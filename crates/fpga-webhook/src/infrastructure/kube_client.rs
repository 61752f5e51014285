use std::path::Path;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

#[derive(Debug, derive_more::Display)]
pub enum KubernetesError {
    #[display("unable to load cluster configuration from {origin}")]
    Config { origin: String },
    #[display("unable to build Kubernetes client")]
    Client,
}

impl core::error::Error for KubernetesError {}

/// Builds a client from `kubeconfig`, or from the in-cluster environment
/// and `~/.kube/config` when no path is given.
pub async fn init_kube_client(kubeconfig: Option<&Path>) -> Result<Client, Report<KubernetesError>> {
    let config = match kubeconfig {
        Some(path) => config_from_file(path).await?,
        None => Config::infer()
            .await
            .change_context(KubernetesError::Config {
                origin: "the in-cluster environment or default kubeconfig".to_string(),
            })?,
    };

    Client::try_from(config).change_context(KubernetesError::Client)
}

async fn config_from_file(path: &Path) -> Result<Config, Report<KubernetesError>> {
    let config_error = || KubernetesError::Config {
        origin: path.display().to_string(),
    };

    let kubeconfig = Kubeconfig::read_from(path).change_context_lazy(config_error)?;
    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .change_context_lazy(config_error)
        .attach_printable("the file was read but holds no usable context")
}
