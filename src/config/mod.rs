//! Configuration loaded from `.codevet.toml`.

mod core;
mod loader;

pub use self::core::{CacheConfig, CodevetConfig, EmbeddingsConfig, ModelsConfig, RulesConfig};
pub use loader::{
    directory_ancestors, load_config, load_config_from, parse_config, try_load_config_from_path,
    CONFIG_FILE_NAME,
};
