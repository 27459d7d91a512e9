//! Three-zone banded layout.
//!
//! A band of small rows at the top, a band of large rows in the middle and a
//! mirrored band of small rows at the bottom. The band split is searched for a
//! produced count close to the request; when no split lands inside the accepted
//! count window the target is relaxed to 80% and the search repeats, falling
//! back to the grid search once the target reaches the floor.

use crate::layout::geometry::{centered, px, Point, Size};
use crate::layout::{grid_search, Layout, LayoutAlgorithm, LayoutRequest};

pub const PADDING_PX: u32 = 4;
/// Relaxed targets at or below this count fall back to the grid search
pub const FALLBACK_FLOOR: usize = 4;
/// Hard cap on relaxation rounds, independent of the count floor
pub const MAX_RELAXATIONS: usize = 16;
const RELAXATION_FACTOR: f64 = 0.8;
const WINDOW_LOW: f64 = 0.5;
const WINDOW_HIGH: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bands {
    small_rows: usize,
    large_rows: usize,
    small_cell: (f64, f64),
    large_cell: (f64, f64),
    small_cols: usize,
    large_cols: usize,
}

impl Bands {
    fn count(&self) -> usize {
        2 * self.small_rows * self.small_cols + self.large_rows * self.large_cols
    }
}

/// Large-to-small row height ratio for a target aspect ratio
pub fn zone_size_ratio(target_aspect: f64) -> f64 {
    if target_aspect >= 2.0 {
        2.0
    } else if target_aspect >= 1.6 {
        1.6
    } else if target_aspect >= 1.33 {
        1.33
    } else {
        1.25
    }
}

pub(crate) fn solve(request: &LayoutRequest) -> Layout {
    let canvas = Size::new(request.canvas_width(), request.canvas_height());
    let ratio = zone_size_ratio(request.target_aspect_ratio());
    let mut target = request.item_count() as f64;

    for _ in 0..MAX_RELAXATIONS {
        if let Some(bands) = best_bands(target, request.source_aspect_ratio(), ratio, canvas) {
            return place(bands, canvas);
        }
        target *= RELAXATION_FACTOR;
        if target <= FALLBACK_FLOOR as f64 {
            break;
        }
    }

    grid_search::search(
        request.item_count().max(FALLBACK_FLOOR),
        request.source_aspect_ratio(),
        canvas,
    )
}

fn best_bands(target: f64, source_aspect: f64, ratio: f64, canvas: Size) -> Option<Bands> {
    let padding = f64::from(PADDING_PX);
    let width = f64::from(canvas.width);
    let height = f64::from(canvas.height);
    let max_small_rows = (target as usize / 10).max(8);

    let mut best: Option<(Bands, f64)> = None;
    for small_rows in 1..=max_small_rows {
        let large_rows = small_rows.div_ceil(2);
        let total_rows = 2 * small_rows + large_rows;
        let available = height - (total_rows as f64 + 1.0) * padding;
        let small_height = available / (2.0 * small_rows as f64 + large_rows as f64 * ratio);
        if small_height < 1.0 {
            break;
        }
        let large_height = small_height * ratio;
        let small_cell = (small_height * source_aspect, small_height);
        let large_cell = (large_height * source_aspect, large_height);
        let small_cols = ((width - padding) / (small_cell.0 + padding)).floor() as usize;
        let large_cols = ((width - padding) / (large_cell.0 + padding)).floor() as usize;
        if small_cols == 0 || large_cols == 0 {
            continue;
        }

        let bands = Bands {
            small_rows,
            large_rows,
            small_cell,
            large_cell,
            small_cols,
            large_cols,
        };
        let produced = bands.count() as f64;
        if produced < WINDOW_LOW * target || produced > WINDOW_HIGH * target {
            continue;
        }
        let diff = (produced - target).abs();
        if best.map_or(true, |(_, best_diff)| diff < best_diff) {
            best = Some((bands, diff));
        }
    }

    best.map(|(bands, _)| bands)
}

fn place(bands: Bands, canvas: Size) -> Layout {
    let small = Size::new(px(bands.small_cell.0), px(bands.small_cell.1));
    let large = Size::new(px(bands.large_cell.0), px(bands.large_cell.1));
    let rows: Vec<(Size, usize)> = std::iter::repeat((small, bands.small_cols))
        .take(bands.small_rows)
        .chain(std::iter::repeat((large, bands.large_cols)).take(bands.large_rows))
        .chain(std::iter::repeat((small, bands.small_cols)).take(bands.small_rows))
        .collect();

    let content_height = rows.iter().map(|(cell, _)| cell.height).sum::<u32>()
        + (rows.len() as u32 - 1) * PADDING_PX;
    let mut y = centered(canvas.height, content_height);

    let mut positions = Vec::with_capacity(bands.count());
    let mut sizes = Vec::with_capacity(bands.count());
    for (cell, cols) in &rows {
        let cols = *cols as u32;
        let row_width = cols * cell.width + (cols - 1) * PADDING_PX;
        let x0 = centered(canvas.width, row_width);
        for col in 0..cols {
            positions.push(Point::new(x0 + col * (cell.width + PADDING_PX), y));
            sizes.push(*cell);
        }
        y += cell.height + PADDING_PX;
    }

    Layout::from_cells(
        LayoutAlgorithm::ThreeZone,
        rows.len() as u32,
        bands.small_cols.max(bands.large_cols) as u32,
        canvas,
        positions,
        sizes,
    )
}
