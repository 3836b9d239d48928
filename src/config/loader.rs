use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::core::CodevetConfig;
use crate::errors::{CodevetError, Result};

pub const CONFIG_FILE_NAME: &str = ".codevet.toml";
const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Parse a TOML document and normalize out-of-range values.
pub fn parse_config(contents: &str) -> Result<CodevetConfig> {
    toml::from_str::<CodevetConfig>(contents)
        .map(CodevetConfig::normalized)
        .map_err(|e| CodevetError::Config(format!("Failed to parse {CONFIG_FILE_NAME}: {e}")))
}

/// Load a config file; `None` when it is absent or invalid.
pub fn try_load_config_from_path(config_path: &Path) -> Option<CodevetConfig> {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            // Only log actual errors, not "file not found"
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %config_path.display(), error = %e, "failed to read config file");
            }
            return None;
        }
    };

    match parse_config(&contents) {
        Ok(config) => {
            debug!(path = %config_path.display(), "loaded config");
            Some(config)
        }
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "invalid config; using defaults");
            None
        }
    }
}

/// `start` and its ancestors, nearest first, at most `max_depth` entries.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Search `start` and its ancestors for `.codevet.toml`.
pub fn load_config_from(start: &Path) -> CodevetConfig {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            debug!(
                checked = MAX_TRAVERSAL_DEPTH,
                "no config found; using default config"
            );
            CodevetConfig::default()
        })
}

pub fn load_config() -> CodevetConfig {
    match std::env::current_dir() {
        Ok(current) => load_config_from(&current),
        Err(e) => {
            warn!(error = %e, "failed to get current directory; using default config");
            CodevetConfig::default()
        }
    }
}
