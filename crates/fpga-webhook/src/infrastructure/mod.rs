pub mod kube_client;

pub use kube_client::init_kube_client;
pub use kube_client::KubernetesError;
