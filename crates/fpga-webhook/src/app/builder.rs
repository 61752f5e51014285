use std::sync::Arc;

use anyhow::Result;
use kube::Client;

use crate::admission::AdmissionAdapter;
use crate::admission::PodCodec;
use crate::app::core::Application;
use crate::app::core::ApplicationServices;
use crate::config::ServeArgs;
use crate::infrastructure::init_kube_client;
use crate::patcher::AfuDevTypeCatalog;
use crate::patcher::PatcherManager;

/// Wires the webhook's components together.
pub struct ApplicationBuilder {
    serve_args: ServeArgs,
    client: Option<Client>,
}

impl ApplicationBuilder {
    pub fn new(serve_args: ServeArgs) -> Self {
        Self {
            serve_args,
            client: None,
        }
    }

    /// Uses `client` instead of building one from the kubeconfig settings.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub async fn build(self) -> Result<Application> {
        let client = match self.client {
            Some(client) => client,
            None => init_kube_client(self.serve_args.kubeconfig.as_deref())
                .await
                .map_err(|e| anyhow::anyhow!("{e:?}"))?,
        };

        let manager = Arc::new(PatcherManager::new(
            Arc::new(AfuDevTypeCatalog),
            PodCodec::default(),
        ));
        let adapter = AdmissionAdapter::new(Arc::clone(&manager));

        let services = ApplicationServices {
            client,
            manager,
            adapter,
        };

        Ok(Application::new(services, self.serve_args))
    }
}
