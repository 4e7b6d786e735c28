//! Configuration management

mod defaults;
mod migration;
mod settings;

pub use defaults::CONFIG_VERSION;
pub use migration::migrate;
pub use settings::{AppConfig, LinkConfig, StorageConfig};
