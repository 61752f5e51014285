//! Translation of generic FPGA resource requests into the concrete
//! resources advertised by the device plugins.

mod canonical;
mod catalog;
mod error;
mod manager;
mod quantity;
mod resources;
mod translator;

pub use canonical::canonize_id;
pub use catalog::AfuDevTypeCatalog;
pub use catalog::CatalogError;
pub use catalog::DeviceCatalog;
pub use error::PatchError;
pub use manager::PatcherManager;
pub use quantity::ParsedQuantity;
pub use quantity::QuantityError;
pub use translator::escape_pointer;
pub use translator::DeviceFunctionDescriptor;
pub use translator::RegionDescriptor;
pub use translator::Translator;
pub use translator::MAX_REGION_UNITS;
pub use translator::RESOURCE_PREFIX;
