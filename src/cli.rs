//! Command-line interface for the `mosaic` binary.

use crate::config::{ConfigLoader, MosaicConfig};
use crate::layout::{compute_layout, DisplayBounds, Layout, LayoutAlgorithm, LayoutRequest};
use crate::logging::LoggingConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use std::path::PathBuf;

/// Mosaic CLI - thumbnail mosaic layouts
#[derive(Parser, Debug)]
#[command(name = "mosaic")]
#[command(about = "Compute thumbnail mosaic layouts and inspect configuration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a layout and print its geometry
    Layout {
        /// Layout algorithm: screen_fit, three_zone, grid_search, center_emphasis,
        /// single_column (defaults to the configured one)
        #[arg(long, short)]
        algorithm: Option<LayoutAlgorithm>,
        /// Number of thumbnails to place
        #[arg(long, short = 'n', default_value = "12")]
        count: i64,
        /// Canvas width in pixels (defaults to the configured one)
        #[arg(long, short)]
        width: Option<i64>,
        /// Source aspect ratio, as `16:9` or `1.7778`
        #[arg(long, default_value = "16:9", value_parser = parse_aspect)]
        source_aspect: f64,
        /// Target canvas aspect ratio (defaults to the configured one)
        #[arg(long, value_parser = parse_aspect)]
        target_aspect: Option<f64>,
        /// Density factor (defaults to the configured one)
        #[arg(long)]
        density: Option<f64>,
        /// Display bounds for screen fit, as `WIDTHxHEIGHT@SCALE`
        #[arg(long, value_parser = parse_display)]
        display: Option<DisplayBounds>,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Include every cell in table output
        #[arg(long)]
        cells: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Parse `W:H` or a plain ratio
pub fn parse_aspect(value: &str) -> Result<f64, String> {
    let ratio = match value.split_once(':') {
        Some((w, h)) => {
            let w: f64 = w.trim().parse().map_err(|_| format!("invalid width in '{}'", value))?;
            let h: f64 = h.trim().parse().map_err(|_| format!("invalid height in '{}'", value))?;
            w / h
        }
        None => value
            .trim()
            .parse()
            .map_err(|_| format!("invalid aspect ratio '{}'", value))?,
    };
    if ratio.is_finite() && ratio > 0.0 {
        Ok(ratio)
    } else {
        Err(format!("aspect ratio '{}' must be positive", value))
    }
}

/// Parse `WIDTHxHEIGHT` with an optional `@SCALE` suffix
pub fn parse_display(value: &str) -> Result<DisplayBounds, String> {
    let (dims, scale) = match value.split_once('@') {
        Some((dims, scale)) => (
            dims,
            scale
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid scale in '{}'", value))?,
        ),
        None => (value, 1.0),
    };
    let (w, h) = dims
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width = w.trim().parse().map_err(|_| format!("invalid width in '{}'", value))?;
    let height = h.trim().parse().map_err(|_| format!("invalid height in '{}'", value))?;
    Ok(DisplayBounds::new(width, height, scale))
}

/// Loaded configuration plus command execution
pub struct RunContext {
    config: MosaicConfig,
}

impl RunContext {
    pub fn new(workspace: PathBuf, config_path: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ConfigLoader::load(&workspace)
                .with_context(|| format!("Failed to load config for {}", workspace.display()))?,
        };
        Ok(Self {
            config: config.validated()?,
        })
    }

    pub fn from_config(config: MosaicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::Layout {
                algorithm,
                count,
                width,
                source_aspect,
                target_aspect,
                density,
                display,
                format,
                cells,
            } => {
                let defaults = &self.config.layout;
                let mut request = LayoutRequest::new(
                    *source_aspect,
                    target_aspect.unwrap_or(defaults.target_aspect_ratio),
                    *count,
                    width.unwrap_or_else(|| i64::from(defaults.canvas_width)),
                    algorithm.unwrap_or(defaults.algorithm),
                    density.unwrap_or(defaults.density_factor),
                )?;
                if let Some(display) = display {
                    request = request.with_display(*display)?;
                }
                let layout = compute_layout(&request);
                match format {
                    OutputFormat::Json => Ok(serde_json::to_string_pretty(&layout)?),
                    OutputFormat::Table => Ok(render_layout(&request, &layout, *cells)),
                }
            }
            Commands::Config => Ok(ConfigLoader::to_toml(&self.config)?),
        }
    }
}

fn render_layout(request: &LayoutRequest, layout: &Layout, cells: bool) -> String {
    let mut summary = Table::new();
    summary.load_preset(comfy_table::presets::UTF8_FULL);
    summary.set_header(vec!["Field", "Value"]);
    summary.add_row(vec!["Requested".to_string(), request.algorithm().to_string()]);
    summary.add_row(vec!["Algorithm".to_string(), layout.algorithm.to_string()]);
    summary.add_row(vec!["Items requested".to_string(), request.item_count().to_string()]);
    summary.add_row(vec!["Items placed".to_string(), layout.placed_count.to_string()]);
    summary.add_row(vec!["Grid".to_string(), format!("{} x {}", layout.rows, layout.cols)]);
    summary.add_row(vec![
        "Canvas".to_string(),
        format!("{} x {}", layout.canvas_size.width, layout.canvas_size.height),
    ]);

    if !cells {
        return summary.to_string();
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["#", "X", "Y", "Width", "Height"]);
    for (index, (position, size)) in layout.cells().enumerate() {
        table.add_row(vec![
            index.to_string(),
            position.x.to_string(),
            position.y.to_string(),
            size.width.to_string(),
            size.height.to_string(),
        ]);
    }
    format!("{}\n{}", summary, table)
}

/// Logging configuration from the config file, overridden by CLI flags
pub fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .map(|c| c.logging)
            .unwrap_or_default(),
        None => ConfigLoader::load(&cli.workspace)
            .map(|c| c.logging)
            .unwrap_or_default(),
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(level) = &cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        config.output = output.clone();
    }
    config
}
