use api_types::UnknownModeError;

use super::catalog::CatalogError;

/// Reasons a container cannot be patched or a mapping cannot be stored.
///
/// The display text is what a denied admission request reports back.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum PatchError {
    #[display("environment variable '{name}' is not allowed")]
    ReservedEnvVar { name: String },

    #[display(
        "'limits' and 'requests' for {resource:?} must be equal as extended resources cannot be overcommitted"
    )]
    Overcommitted { resource: String },

    #[display("resource quantity isn't of integral type for {resource:?}")]
    NonIntegralQuantity { resource: String },

    #[display("invalid quantity {value:?} for {resource:?}")]
    InvalidQuantity { resource: String, value: String },

    #[display("resource quantity {value:?} can't be negative for {resource:?}")]
    NegativeQuantity { resource: String, value: String },

    #[display("{requested} FPGA region units requested, at most {limit} fit in one container")]
    TooManyRegionUnits { requested: i64, limit: i64 },

    #[display("no such resource: {resource:?}")]
    NoSuchResource { resource: String },

    #[display("resources require incompatible modes in one container")]
    IncompatibleModes,

    #[display("{_0}")]
    Catalog(CatalogError),

    #[display("{_0}")]
    UnknownMode(UnknownModeError),

    #[display("unable to serialize patch value: {reason}")]
    Serialization { reason: String },
}

impl core::error::Error for PatchError {}

impl From<CatalogError> for PatchError {
    fn from(err: CatalogError) -> Self {
        PatchError::Catalog(err)
    }
}

impl From<UnknownModeError> for PatchError {
    fn from(err: UnknownModeError) -> Self {
        PatchError::UnknownMode(err)
    }
}
