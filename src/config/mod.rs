pub mod schema;

use std::path::Path;

use tracing::debug;

use crate::error::{BridgeError, Result};

pub use schema::{BridgeConfig, CallableList, RendererConfig, RendererOptions};

pub const CONFIG_FILE: &str = "bridge.toml";

/// Load and validate a BridgeConfig from a bridge.toml file or the directory holding it.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    let config_path = if path.is_dir() {
        path.join(CONFIG_FILE)
    } else {
        path.to_path_buf()
    };

    if !config_path.exists() {
        return Err(BridgeError::ConfigNotFound { path: config_path });
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| BridgeError::Io {
        context: format!("reading {}", config_path.display()),
        source: e,
    })?;

    let mut config: BridgeConfig =
        toml::from_str(&content).map_err(|e| BridgeError::ConfigParse { source: e })?;

    let root = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    config.renderer.paths = config
        .renderer
        .paths
        .into_iter()
        .map(|p| if p.is_relative() { root.join(p) } else { p })
        .collect();
    config.root = root;

    config.validate()?;

    debug!(path = %config_path.display(), "loaded bridge config");
    Ok(config)
}
