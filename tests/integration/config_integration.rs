//! Layered configuration loading

use mosaic::config::{ConfigLoader, MosaicConfig, WORKSPACE_CONFIG_FILE};
use mosaic::layout::LayoutAlgorithm;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that read or set `MOSAIC__*` environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn write_global(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("global.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_defaults_without_any_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let workspace = TempDir::new().unwrap();

    let config = ConfigLoader::load_layered(workspace.path(), None).unwrap();

    assert_eq!(config, MosaicConfig::default());
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let workspace = TempDir::new().unwrap();
    let global_dir = TempDir::new().unwrap();
    let global = write_global(
        &global_dir,
        r#"
[coordinator]
concurrency_limit = 2
stall_timeout_secs = 10.0

[layout]
canvas_width = 1280
"#,
    );
    fs::write(
        workspace.path().join(WORKSPACE_CONFIG_FILE),
        r#"
[coordinator]
concurrency_limit = 5

[layout]
algorithm = "three_zone"

[output]
format = "jpg"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_layered(workspace.path(), Some(&global)).unwrap();

    assert_eq!(config.coordinator.concurrency_limit, 5);
    assert_eq!(config.coordinator.stall_timeout_secs, 10.0);
    assert_eq!(config.layout.canvas_width, 1280);
    assert_eq!(config.layout.algorithm, LayoutAlgorithm::ThreeZone);
    assert_eq!(config.output.format, "jpg");
    assert_eq!(config.extraction, MosaicConfig::default().extraction);
    assert!(config.validated().is_ok());
}

#[test]
fn test_missing_global_file_is_ignored() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let workspace = TempDir::new().unwrap();
    let missing = workspace.path().join("nowhere").join("config.toml");

    let config = ConfigLoader::load_layered(workspace.path(), Some(&missing)).unwrap();

    assert_eq!(config.coordinator.concurrency_limit, 0);
}

#[test]
fn test_environment_overrides_files() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join(WORKSPACE_CONFIG_FILE),
        "[extraction]\nmax_in_flight = 8\n",
    )
    .unwrap();

    std::env::set_var("MOSAIC__EXTRACTION__MAX_IN_FLIGHT", "12");
    let loaded = ConfigLoader::load_layered(workspace.path(), None);
    std::env::remove_var("MOSAIC__EXTRACTION__MAX_IN_FLIGHT");

    assert_eq!(loaded.unwrap().extraction.max_in_flight, 12);
}

#[test]
fn test_load_from_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[layout]\ndensity_factor = 2.5\n").unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(config.layout.density_factor, 2.5);

    assert!(ConfigLoader::load_from_file(&dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_invalid_values_load_but_fail_validation() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join(WORKSPACE_CONFIG_FILE),
        "[coordinator]\nconcurrency_limit = -3\n\n[extraction]\nedge_margin = 0.7\n",
    )
    .unwrap();

    let config = ConfigLoader::load_layered(workspace.path(), None).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(config.validated().is_err());
}

#[test]
fn test_rendered_toml_loads_back() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let mut original = MosaicConfig::default();
    original.coordinator.concurrency_limit = 6;
    original.layout.algorithm = LayoutAlgorithm::CenterEmphasis;

    let path = dir.path().join("rendered.toml");
    fs::write(&path, ConfigLoader::to_toml(&original).unwrap()).unwrap();

    assert_eq!(ConfigLoader::load_from_file(&path).unwrap(), original);
}
