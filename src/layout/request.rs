//! Validated layout requests.

use crate::error::ConfigurationError;
use crate::layout::geometry::DisplayBounds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Packing algorithm selected by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutAlgorithm {
    /// Fill the available display at a readable cell size
    ScreenFit,
    /// Small bands above and below a band of large cells
    ThreeZone,
    /// Classic uniform grid chosen by exhaustive row search
    GridSearch,
    /// Cells shrink with distance from the grid center
    CenterEmphasis,
    /// One column, capped canvas height
    SingleColumn,
}

impl LayoutAlgorithm {
    pub const ALL: [LayoutAlgorithm; 5] = [
        LayoutAlgorithm::ScreenFit,
        LayoutAlgorithm::ThreeZone,
        LayoutAlgorithm::GridSearch,
        LayoutAlgorithm::CenterEmphasis,
        LayoutAlgorithm::SingleColumn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutAlgorithm::ScreenFit => "screen_fit",
            LayoutAlgorithm::ThreeZone => "three_zone",
            LayoutAlgorithm::GridSearch => "grid_search",
            LayoutAlgorithm::CenterEmphasis => "center_emphasis",
            LayoutAlgorithm::SingleColumn => "single_column",
        }
    }
}

impl fmt::Display for LayoutAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutAlgorithm {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "screen_fit" | "screen" => Ok(LayoutAlgorithm::ScreenFit),
            "three_zone" | "zones" => Ok(LayoutAlgorithm::ThreeZone),
            "grid_search" | "grid" | "classic" => Ok(LayoutAlgorithm::GridSearch),
            "center_emphasis" | "dynamic" => Ok(LayoutAlgorithm::CenterEmphasis),
            "single_column" | "compact" => Ok(LayoutAlgorithm::SingleColumn),
            other => Err(ConfigurationError::Invalid(format!(
                "Unknown layout algorithm: {}",
                other
            ))),
        }
    }
}

/// Input to the layout engine.
///
/// Fields are private so every instance has passed validation: aspect ratios
/// and density are finite and positive, the item count and canvas width are
/// non-zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutRequest {
    source_aspect_ratio: f64,
    target_aspect_ratio: f64,
    item_count: usize,
    canvas_width: u32,
    algorithm: LayoutAlgorithm,
    density_factor: f64,
    display: Option<DisplayBounds>,
}

impl LayoutRequest {
    pub fn new(
        source_aspect_ratio: f64,
        target_aspect_ratio: f64,
        item_count: i64,
        canvas_width: i64,
        algorithm: LayoutAlgorithm,
        density_factor: f64,
    ) -> Result<Self, ConfigurationError> {
        validate_aspect("source aspect ratio", source_aspect_ratio)?;
        validate_aspect("target aspect ratio", target_aspect_ratio)?;
        if item_count < 1 {
            return Err(ConfigurationError::InvalidItemCount(item_count));
        }
        if canvas_width < 1 || canvas_width > i64::from(u32::MAX) {
            return Err(ConfigurationError::InvalidCanvasWidth(canvas_width));
        }
        if !density_factor.is_finite() || density_factor <= 0.0 {
            return Err(ConfigurationError::InvalidDensity(density_factor));
        }

        Ok(Self {
            source_aspect_ratio,
            target_aspect_ratio,
            item_count: item_count as usize,
            canvas_width: canvas_width as u32,
            algorithm,
            density_factor,
            display: None,
        })
    }

    /// Attach display bounds for the screen-fit algorithm
    pub fn with_display(mut self, display: DisplayBounds) -> Result<Self, ConfigurationError> {
        if display.width == 0 || display.height == 0 {
            return Err(ConfigurationError::InvalidDisplay(format!(
                "{}x{} has a zero dimension",
                display.width, display.height
            )));
        }
        if !display.scale.is_finite() || display.scale <= 0.0 {
            return Err(ConfigurationError::InvalidDisplay(format!(
                "scale {} must be positive",
                display.scale
            )));
        }
        self.display = Some(display);
        Ok(self)
    }

    pub fn source_aspect_ratio(&self) -> f64 {
        self.source_aspect_ratio
    }

    pub fn target_aspect_ratio(&self) -> f64 {
        self.target_aspect_ratio
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    pub fn algorithm(&self) -> LayoutAlgorithm {
        self.algorithm
    }

    pub fn density_factor(&self) -> f64 {
        self.density_factor
    }

    pub fn display(&self) -> Option<DisplayBounds> {
        self.display
    }

    /// Canvas height implied by the width and target aspect ratio
    pub fn canvas_height(&self) -> u32 {
        let height = (f64::from(self.canvas_width) / self.target_aspect_ratio).round();
        if height >= 1.0 {
            height.min(f64::from(u32::MAX)) as u32
        } else {
            1
        }
    }
}

fn validate_aspect(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidAspectRatio { field, value })
    }
}
