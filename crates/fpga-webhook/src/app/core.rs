use std::sync::Arc;

use anyhow::Result;
use kube::Client;

use crate::admission::AdmissionAdapter;
use crate::app::tasks::Tasks;
use crate::config::ServeArgs;
use crate::patcher::PatcherManager;

/// Long-lived components shared by the application's tasks.
pub struct ApplicationServices {
    pub client: Client,
    pub manager: Arc<PatcherManager>,
    pub adapter: AdmissionAdapter,
}

/// Application core structure with explicit dependencies
pub struct Application {
    services: ApplicationServices,
    serve_args: ServeArgs,
}

impl Application {
    pub fn new(services: ApplicationServices, serve_args: ServeArgs) -> Self {
        Self {
            services,
            serve_args,
        }
    }

    pub fn services(&self) -> &ApplicationServices {
        &self.services
    }

    pub fn serve_args(&self) -> &ServeArgs {
        &self.serve_args
    }

    /// Run application, start all tasks and wait for completion
    pub async fn run(&self) -> Result<()> {
        tracing::info!("Starting all application tasks...");

        let mut tasks = Tasks::new();
        tasks.spawn_all_tasks(self);

        if let Err(e) = tasks.wait_for_completion(self.serve_args.shutdown_timeout()).await {
            tracing::error!("Error during task execution: {e:#}");
            return Err(e);
        }

        tracing::info!(
            namespaces = self.services.manager.namespaces(),
            "Application run completed"
        );
        Ok(())
    }
}
