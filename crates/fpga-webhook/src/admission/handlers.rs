use kube::core::admission::AdmissionReview;
use kube::core::DynamicObject;
use poem::handler;
use poem::web::Data;
use poem::web::Json;

use super::AdmissionAdapter;

/// Mutates pods submitted by the API server.
#[handler]
pub async fn mutate_pods(
    body: Vec<u8>,
    adapter: Data<&AdmissionAdapter>,
) -> Json<AdmissionReview<DynamicObject>> {
    Json(adapter.review(&body))
}

#[handler]
pub async fn healthz() -> &'static str {
    "ok"
}
