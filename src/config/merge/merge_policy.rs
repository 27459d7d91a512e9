//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources win key by key: defaults, global file, workspace files,
//! then `MOSAIC__` environment variables.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Prefix of environment overrides, e.g. `MOSAIC__COORDINATOR__CONCURRENCY_LIMIT=4`
pub const ENV_PREFIX: &str = "MOSAIC";
pub const ENV_SEPARATOR: &str = "__";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("coordinator.concurrency_limit", 0)?
        .set_default("coordinator.stall_timeout_secs", 60.0)?
        .set_default("layout.algorithm", "grid_search")?
        .set_default("output.directory", "mosaics")?
        .set_default("output.format", "png")
}

/// Environment source applied last
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
