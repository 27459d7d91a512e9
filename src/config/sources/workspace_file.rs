//! Workspace config file source: mosaic.toml and mosaic.{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use std::path::{Path, PathBuf};

pub const WORKSPACE_CONFIG_FILE: &str = "mosaic.toml";

/// Environment variable selecting the environment-specific workspace file
pub const ENV_NAME_VAR: &str = "MOSAIC_ENV";

/// Workspace config files in precedence order: base, then env-specific.
pub fn workspace_config_paths(workspace_root: &Path) -> Vec<PathBuf> {
    let mut paths = vec![workspace_root.join(WORKSPACE_CONFIG_FILE)];
    if let Ok(env_name) = std::env::var(ENV_NAME_VAR) {
        if !env_name.trim().is_empty() {
            paths.push(workspace_root.join(format!("mosaic.{}.toml", env_name.trim())));
        }
    }
    paths
}

/// Add workspace config files to builder.
pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    for path in workspace_config_paths(workspace_root) {
        if path.exists() {
            builder = builder.add_source(File::from(path).required(false));
        }
    }
    builder
}
