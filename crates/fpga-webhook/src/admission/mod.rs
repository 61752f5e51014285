//! The admission surface: decoding reviews, answering them and serving
//! them over HTTP.

mod codec;
mod handlers;
mod server;

use std::sync::Arc;

use kube::core::admission::AdmissionResponse;
use kube::core::admission::AdmissionReview;
use kube::core::DynamicObject;
use tracing::warn;

pub use self::codec::DecodeError;
pub use self::codec::PodCodec;
pub use self::server::routes;
pub use self::server::ServerError;
pub use self::server::WebhookServer;
use crate::patcher::PatcherManager;

/// Answers a raw `AdmissionReview` body.
///
/// A body that does not decode into a review with a request is answered
/// with an `invalid` review instead of an HTTP error, as the API server
/// expects.
#[derive(Clone)]
pub struct AdmissionAdapter {
    manager: Arc<PatcherManager>,
}

impl AdmissionAdapter {
    pub fn new(manager: Arc<PatcherManager>) -> Self {
        Self { manager }
    }

    pub fn review(&self, body: &[u8]) -> AdmissionReview<DynamicObject> {
        match self.manager.codec().decode_review(body) {
            Ok(request) => self.manager.mutate_pod(&request).into_review(),
            Err(e) => {
                warn!(error = %e, "rejecting admission review");
                AdmissionResponse::invalid(e).into_review()
            }
        }
    }
}
