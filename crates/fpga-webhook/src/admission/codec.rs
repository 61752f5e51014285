use k8s_openapi::api::core::v1::Pod;
use kube::core::admission::AdmissionRequest;
use kube::core::admission::AdmissionReview;
use kube::core::DynamicObject;
use kube::core::GroupVersionResource;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum DecodeError {
    #[display("malformed admission review: {reason}")]
    MalformedReview { reason: String },
    #[display("unexpected resource type {group:?}/{version}/{resource}")]
    UnexpectedResource {
        group: String,
        version: String,
        resource: String,
    },
    #[display("unable to decode pod: {reason}")]
    InvalidObject { reason: String },
}

impl core::error::Error for DecodeError {}

/// Decodes admission reviews and the pods they carry.
///
/// Built once at startup and handed to whoever admits pods.
#[derive(Debug, Clone)]
pub struct PodCodec {
    resource: GroupVersionResource,
}

impl Default for PodCodec {
    fn default() -> Self {
        Self {
            resource: GroupVersionResource::gvr("", "v1", "pods"),
        }
    }
}

impl PodCodec {
    pub fn decode_review(&self, body: &[u8]) -> Result<AdmissionRequest<DynamicObject>, DecodeError> {
        let malformed = |reason: String| DecodeError::MalformedReview { reason };

        let review: AdmissionReview<DynamicObject> =
            serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;
        let request: Result<AdmissionRequest<DynamicObject>, _> = review.try_into();
        request.map_err(|e| malformed(e.to_string()))
    }

    fn accepts(&self, resource: &GroupVersionResource) -> bool {
        // Compared field by field: a deserialized resource has no cached api version.
        resource.group == self.resource.group
            && resource.version == self.resource.version
            && resource.resource == self.resource.resource
    }

    /// Extracts the pod of a request. A request without an object yields an
    /// empty pod.
    pub fn decode_pod(&self, request: &AdmissionRequest<DynamicObject>) -> Result<Pod, DecodeError> {
        if !self.accepts(&request.resource) {
            return Err(DecodeError::UnexpectedResource {
                group: request.resource.group.clone(),
                version: request.resource.version.clone(),
                resource: request.resource.resource.clone(),
            });
        }

        let Some(object) = request.object.as_ref() else {
            return Ok(Pod::default());
        };

        let invalid = |e: serde_json::Error| DecodeError::InvalidObject {
            reason: e.to_string(),
        };
        let value = serde_json::to_value(object).map_err(invalid)?;
        serde_json::from_value(value).map_err(invalid)
    }
}
