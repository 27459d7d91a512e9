//! Global config file source: the platform config directory's `mosaic/config.toml`

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path to the global config file, e.g. `~/.config/mosaic/config.toml` on Linux.
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mosaic").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: Option<&Path>,
) -> ConfigBuilder<DefaultState> {
    match path {
        Some(path) if path.exists() => {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            builder.add_source(File::from(canonical).required(false))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No global configuration file");
            builder
        }
        None => builder,
    }
}
