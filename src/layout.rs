//! Layout Engine
//!
//! Pure, deterministic placement of N thumbnails on a canvas. Five algorithms are
//! selectable through [`LayoutAlgorithm`]; none of them fails on an awkward
//! request. They relax their parameters or fall back to the grid search and
//! always return a layout with at least one placed item.
//!
//! ```
//! use mosaic::layout::{compute_layout, LayoutAlgorithm, LayoutRequest};
//!
//! let request =
//!     LayoutRequest::new(16.0 / 9.0, 16.0 / 9.0, 12, 1920, LayoutAlgorithm::GridSearch, 1.0)
//!         .unwrap();
//! let layout = compute_layout(&request);
//! assert!(layout.placed_count >= 12);
//! assert_eq!(layout.positions.len(), layout.placed_count);
//! ```

pub mod center_emphasis;
pub mod geometry;
pub mod grid_search;
pub mod request;
pub mod screen_fit;
pub mod single_column;
pub mod three_zone;

pub use geometry::{DisplayBounds, Point, Size};
pub use request::{LayoutAlgorithm, LayoutRequest};

use crate::error::LayoutError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tolerance, in pixels, allowed between a placed rectangle and the canvas edge
pub const ROUNDING_TOLERANCE_PX: u32 = 1;

/// Concrete grid geometry for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Algorithm that produced the geometry (differs from the request after a fallback)
    pub algorithm: LayoutAlgorithm,
    pub rows: u32,
    pub cols: u32,
    pub canvas_size: Size,
    pub positions: Vec<Point>,
    pub sizes: Vec<Size>,
    pub placed_count: usize,
}

impl Layout {
    /// Assemble a layout from parallel cell vectors.
    ///
    /// The canvas is grown when a degenerate request (a canvas narrower than the
    /// fixed spacing, say) pushed a one-pixel cell past its edge.
    pub(crate) fn from_cells(
        algorithm: LayoutAlgorithm,
        rows: u32,
        cols: u32,
        canvas_size: Size,
        positions: Vec<Point>,
        sizes: Vec<Size>,
    ) -> Self {
        debug_assert_eq!(positions.len(), sizes.len());
        let (max_x, max_y) = positions
            .iter()
            .zip(&sizes)
            .fold((0u32, 0u32), |(mx, my), (p, s)| {
                (
                    mx.max(p.x.saturating_add(s.width)),
                    my.max(p.y.saturating_add(s.height)),
                )
            });
        let grown = Size::new(
            canvas_size.width.max(max_x).max(1),
            canvas_size.height.max(max_y).max(1),
        );
        if grown != canvas_size {
            debug!(
                algorithm = %algorithm,
                requested_width = canvas_size.width,
                requested_height = canvas_size.height,
                width = grown.width,
                height = grown.height,
                "Canvas grown to cover every cell"
            );
        }
        let canvas_size = grown;
        let placed_count = positions.len();

        Self {
            algorithm,
            rows: rows.max(1),
            cols: cols.max(1),
            canvas_size,
            positions,
            sizes,
            placed_count,
        }
    }

    /// Iterate `(position, size)` pairs in placement order
    pub fn cells(&self) -> impl Iterator<Item = (Point, Size)> + '_ {
        self.positions.iter().copied().zip(self.sizes.iter().copied())
    }

    /// Whether every rectangle lies inside the canvas, within the rounding tolerance
    pub fn fits_canvas(&self) -> bool {
        self.positions.len() == self.placed_count
            && self.sizes.len() == self.placed_count
            && self.cells().all(|(p, s)| {
                u64::from(p.x) + u64::from(s.width)
                    <= u64::from(self.canvas_size.width) + u64::from(ROUNDING_TOLERANCE_PX)
                    && u64::from(p.y) + u64::from(s.height)
                        <= u64::from(self.canvas_size.height)
                            + u64::from(ROUNDING_TOLERANCE_PX)
            })
    }
}

/// Compute the layout for a validated request.
///
/// Pure and deterministic: identical requests always produce identical layouts.
pub fn compute_layout(request: &LayoutRequest) -> Layout {
    match request.algorithm() {
        LayoutAlgorithm::ScreenFit => screen_fit::solve(request),
        LayoutAlgorithm::ThreeZone => three_zone::solve(request),
        LayoutAlgorithm::GridSearch => grid_search::solve(request),
        LayoutAlgorithm::CenterEmphasis => center_emphasis::solve(request),
        LayoutAlgorithm::SingleColumn => single_column::solve(request),
    }
}

/// Like [`compute_layout`], but reports a layout that placed nothing as an error.
pub fn try_compute_layout(request: &LayoutRequest) -> Result<Layout, LayoutError> {
    let layout = compute_layout(request);
    if layout.placed_count == 0 {
        return Err(LayoutError::Unsatisfiable(format!(
            "{} placed no items for a request of {}",
            request.algorithm(),
            request.item_count()
        )));
    }
    Ok(layout)
}

/// Place `count` equal cells row-major on a `rows x cols` grid centered on the canvas.
pub(crate) fn uniform_grid(
    algorithm: LayoutAlgorithm,
    rows: u32,
    cols: u32,
    count: usize,
    cell: Size,
    spacing: u32,
    canvas: Size,
) -> Layout {
    let cols = cols.max(1);
    let used_rows = (count as u32).div_ceil(cols).max(1);
    let grid_width = cols * cell.width + (cols - 1) * spacing;
    let grid_height = used_rows * cell.height + (used_rows - 1) * spacing;
    let offset_x = geometry::centered(canvas.width, grid_width);
    let offset_y = geometry::centered(canvas.height, grid_height);

    let mut positions = Vec::with_capacity(count);
    let mut sizes = Vec::with_capacity(count);
    for index in 0..count as u32 {
        let row = index / cols;
        let col = index % cols;
        positions.push(Point::new(
            offset_x + col * (cell.width + spacing),
            offset_y + row * (cell.height + spacing),
        ));
        sizes.push(cell);
    }

    Layout::from_cells(algorithm, rows, cols, canvas, positions, sizes)
}
