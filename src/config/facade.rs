//! Configuration loader: assembles the layered sources and deserializes them.

use crate::config::merge::merge_policy;
use crate::config::sources::{global_file, workspace_file};
use crate::config::MosaicConfig;
use crate::error::ConfigurationError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, `mosaic.toml`,
    /// `mosaic.{MOSAIC_ENV}.toml`, `MOSAIC__` environment variables.
    pub fn load(workspace_root: &Path) -> Result<MosaicConfig, ConfigurationError> {
        Self::load_layered(workspace_root, Self::global_config_path().as_deref())
    }

    /// Like [`ConfigLoader::load`], with an explicit global file location.
    pub fn load_layered(
        workspace_root: &Path,
        global_path: Option<&Path>,
    ) -> Result<MosaicConfig, ConfigurationError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder, global_path);
        let builder = workspace_file::add_to_builder(builder, workspace_root);
        let config: MosaicConfig = builder
            .add_source(merge_policy::environment())
            .build()?
            .try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load from a single file, on top of the defaults only
    pub fn load_from_file(path: &Path) -> Result<MosaicConfig, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::Invalid(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config: MosaicConfig = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Default configuration, without reading any source
    pub fn default() -> MosaicConfig {
        MosaicConfig::default()
    }

    /// Global config file path for this platform
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Render a configuration as TOML
    pub fn to_toml(config: &MosaicConfig) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::Invalid(format!("Failed to render config: {}", e)))
    }
}
