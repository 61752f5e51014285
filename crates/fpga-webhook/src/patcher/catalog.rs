use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Resolves the device type a device plugin advertises for an accelerator
/// function unit.
pub trait DeviceCatalog: Send + Sync {
    fn device_type(&self, interface_id: &str, afu_id: &str) -> Result<String, CatalogError>;
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("failed to derive device type for interface {interface_id:?} and AFU {afu_id:?}: {reason}")]
pub struct CatalogError {
    pub interface_id: String,
    pub afu_id: String,
    pub reason: String,
}

impl core::error::Error for CatalogError {}

/// Derives AFU device types the same way the FPGA device plugin names its
/// resources: `af-<if[..3]>.<afu[..3]>.<base64url(if ++ afu)>`.
///
/// The encoded part compresses the two ids so the name stays below the
/// 63 character limit of extended resource names.
#[derive(Debug, Clone, Copy, Default)]
pub struct AfuDevTypeCatalog;

impl DeviceCatalog for AfuDevTypeCatalog {
    fn device_type(&self, interface_id: &str, afu_id: &str) -> Result<String, CatalogError> {
        let fail = |reason: String| CatalogError {
            interface_id: interface_id.to_string(),
            afu_id: afu_id.to_string(),
            reason,
        };

        let bin = hex::decode(format!("{interface_id}{afu_id}"))
            .map_err(|e| fail(format!("not a hex string: {e}")))?;

        let (Some(if_head), Some(afu_head)) = (interface_id.get(..3), afu_id.get(..3)) else {
            return Err(fail("identifiers must be at least 3 characters long".to_string()));
        };

        Ok(format!(
            "af-{if_head}.{afu_head}.{}",
            URL_SAFE_NO_PAD.encode(bin)
        ))
    }
}
