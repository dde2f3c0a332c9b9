pub mod bake;
pub mod config;
pub mod error;
pub mod tiles;

pub use bake::bake;
pub use config::BakeConfig;
pub use error::DriverError;
