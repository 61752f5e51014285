//! Shared API type definitions
//!
//! Custom resources served under the `fpga.intel.com` group and the
//! programming modes their objects may declare. The admission webhook
//! watches these objects and the scheduler extenders read the same shapes.

use std::str::FromStr;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// API group of the FPGA custom resources. Also the prefix of every
/// extended resource name the webhook rewrites.
pub const GROUP: &str = "fpga.intel.com";

/// Version of the FPGA custom resources watched by the webhook.
pub const VERSION: &str = "v2";

/// How a device function is exposed to workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Mode {
    /// A pre-programmed accelerator function unit.
    #[display("af")]
    Af,
    /// A region that gets programmed with the requested bitstream.
    #[display("region")]
    Region,
    /// A region handed to the workload for development, unprogrammed.
    #[display("regiondevel")]
    RegionDevel,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Af, Mode::Region, Mode::RegionDevel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Af => "af",
            Mode::Region => "region",
            Mode::RegionDevel => "regiondevel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{value:?} is not a known mode, expected one of af, region, regiondevel")]
pub struct UnknownModeError {
    pub value: String,
}

impl core::error::Error for UnknownModeError {}

impl FromStr for Mode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownModeError {
                value: s.to_string(),
            })
    }
}

/// A named accelerator function: which bitstream (AFU id) runs on which
/// static region (interface id), and how it is consumed.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Default)]
#[kube(
    group = "fpga.intel.com",
    version = "v2",
    kind = "AcceleratorFunction",
    plural = "acceleratorfunctions",
    shortname = "af",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorFunctionSpec {
    /// AFU identifier, 32 hex digits once canonicalized.
    pub afu_id: String,
    /// Interface identifier of the region the AFU is built for.
    pub interface_id: String,
    /// One of `af`, `region` or `regiondevel`.
    pub mode: String,
}

impl AcceleratorFunctionSpec {
    /// Parses the declared mode.
    pub fn parsed_mode(&self) -> Result<Mode, UnknownModeError> {
        self.mode.parse()
    }
}

/// A named FPGA region type, identified by its interface id.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Default)]
#[kube(
    group = "fpga.intel.com",
    version = "v2",
    kind = "FpgaRegion",
    plural = "fpgaregions",
    shortname = "fpgareg",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FpgaRegionSpec {
    pub interface_id: String,
}
