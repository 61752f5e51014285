use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::admission::WebhookServer;
use crate::app::core::Application;
use crate::config::ControllerConfig;
use crate::controller;

enum Stop {
    Signal(Result<()>),
    Task {
        index: usize,
        result: std::result::Result<Result<()>, JoinError>,
    },
}

/// Task manager, responsible for starting and managing all background tasks
pub struct Tasks {
    tasks: Vec<JoinHandle<Result<()>>>,
    cancellation_token: CancellationToken,
}

impl Default for Tasks {
    fn default() -> Self {
        Self::new()
    }
}

impl Tasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Start all background tasks
    pub fn spawn_all_tasks(&mut self, app: &Application) {
        let controller_task = self.spawn_controller_task(app);
        self.tasks.push(controller_task);

        let server_task = self.spawn_server_task(app);
        self.tasks.push(server_task);
    }

    /// Adds an already running task to the managed set.
    pub fn push(&mut self, task: JoinHandle<Result<()>>) {
        self.tasks.push(task);
    }

    /// Waits for a shutdown signal or for any task to stop, then cancels
    /// the rest and gives them `shutdown_timeout` to finish.
    ///
    /// # Errors
    ///
    /// Returns the error of the first task that failed or panicked.
    pub async fn wait_for_completion(&mut self, shutdown_timeout: Duration) -> Result<()> {
        let stop = if self.tasks.is_empty() {
            Stop::Signal(shutdown_signal().await)
        } else {
            tokio::select! {
                signal = shutdown_signal() => Stop::Signal(signal),
                (result, index, _) = futures::future::select_all(self.tasks.iter_mut()) => {
                    Stop::Task { index, result }
                }
            }
        };

        let result = match stop {
            Stop::Signal(signal) => signal,
            Stop::Task { index, result } => {
                self.tasks.swap_remove(index);
                match result {
                    Ok(Ok(())) => {
                        tracing::warn!("Task completed unexpectedly");
                        Ok(())
                    }
                    Ok(Err(e)) => {
                        tracing::error!("Task failed: {e:#}");
                        Err(e)
                    }
                    Err(e) => {
                        tracing::error!("Task panicked: {e}");
                        Err(e.into())
                    }
                }
            }
        };

        tracing::info!("Cancelling all tasks");
        self.cancellation_token.cancel();
        self.wait_for_tasks_with_timeout(shutdown_timeout).await;

        result
    }

    async fn wait_for_tasks_with_timeout(&mut self, timeout: Duration) {
        tokio::time::timeout(timeout, async {
            for task in &mut self.tasks {
                match task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!("Task failed during shutdown: {e:#}"),
                    Err(e) => tracing::error!("Task panicked during shutdown: {e}"),
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            tracing::warn!("Task shutdown timed out after {:?}", timeout);
        });
    }

    fn spawn_controller_task(&self, app: &Application) -> JoinHandle<Result<()>> {
        let client = app.services().client.clone();
        let manager = app.services().manager.clone();
        let config = ControllerConfig::from(app.serve_args());
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tracing::info!("Starting reconciliation controller task");
            controller::run(client, config, manager, token)
                .await
                .map_err(|e| anyhow::anyhow!("{e:?}"))?;
            tracing::info!("Reconciliation controller task completed");
            Ok(())
        })
    }

    fn spawn_server_task(&self, app: &Application) -> JoinHandle<Result<()>> {
        let server = WebhookServer::new(
            app.services().adapter.clone(),
            app.serve_args().listen_addr.clone(),
        );
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            server
                .run(token)
                .await
                .map_err(|e| anyhow::anyhow!("{e:?}"))?;
            tracing::info!("Admission server task completed");
            Ok(())
        })
    }
}

/// Resolves on SIGTERM or SIGINT.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::signal;
        use tokio::signal::unix::SignalKind;

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }
    Ok(())
}
