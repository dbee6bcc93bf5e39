//! Configuration management
//!
//! TOML file under the XDG config dir, every section optional. The live
//! value sits behind an `ArcSwap` so readers never take a lock.

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Global configuration handle
pub type ConfigHandle = Arc<ArcSwap<AppConfig>>;

/// Create a new config handle with defaults
pub fn new_config_handle() -> ConfigHandle {
    config_handle(AppConfig::default())
}

/// Create a config handle holding `config`
pub fn config_handle(config: AppConfig) -> ConfigHandle {
    Arc::new(ArcSwap::from_pointee(config))
}
