use std::time::Duration;

use error_stack::Report;
use error_stack::ResultExt;
use poem::get;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::post;
use poem::Endpoint;
use poem::EndpointExt;
use poem::Route;
use poem::Server;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handlers::healthz;
use super::handlers::mutate_pods;
use super::AdmissionAdapter;

#[derive(Debug, derive_more::Display)]
pub enum ServerError {
    #[display("Admission server failed on {listen_addr}")]
    Serve { listen_addr: String },
}

impl core::error::Error for ServerError {}

// In-flight reviews get this long to finish once shutdown starts.
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the webhook's routes.
pub fn routes(adapter: AdmissionAdapter) -> impl Endpoint {
    Route::new()
        .at("/pods", post(mutate_pods))
        .at("/healthz", get(healthz))
        .data(adapter)
        .with(Tracing)
}

/// HTTP server answering admission reviews
pub struct WebhookServer {
    adapter: AdmissionAdapter,
    listen_addr: String,
}

impl WebhookServer {
    pub fn new(adapter: AdmissionAdapter, listen_addr: String) -> Self {
        Self {
            adapter,
            listen_addr,
        }
    }

    /// Serves until `token` is cancelled.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Serve`] if binding the address or serving fails
    pub async fn run(self, token: CancellationToken) -> Result<(), Report<ServerError>> {
        info!(listen_addr = %self.listen_addr, "Starting admission webhook server");

        let listener = TcpListener::bind(&self.listen_addr);
        Server::new(listener)
            .run_with_graceful_shutdown(
                routes(self.adapter),
                token.cancelled_owned(),
                Some(GRACEFUL_SHUTDOWN_TIMEOUT),
            )
            .await
            .change_context(ServerError::Serve {
                listen_addr: self.listen_addr.clone(),
            })?;

        info!("Admission webhook server stopped");
        Ok(())
    }
}
