pub mod builder;
pub mod core;
pub mod tasks;

pub use self::builder::ApplicationBuilder;
pub use self::core::Application;
