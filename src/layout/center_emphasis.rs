//! Center emphasis ("dynamic") layout: a near-square grid whose cells are
//! largest in the middle and shrink with taxicab distance from the center.

use crate::layout::geometry::{centered, px, Point, Size};
use crate::layout::{Layout, LayoutAlgorithm, LayoutRequest};

pub const SPACING_PX: u32 = 4;
pub const SCALE_STEP: f64 = 0.15;
pub const MIN_SCALE: f64 = 0.8;
pub const MAX_SCALE: f64 = 1.5;
const MAX_GRID_RATIO: f64 = 2.0;

/// Near-square `(rows, cols)` for `item_count` cells, kept within 2:1 either way
pub fn base_grid(item_count: usize) -> (usize, usize) {
    let item_count = item_count.max(1);
    let mut rows = ((item_count as f64).sqrt().floor() as usize).max(1);
    let mut cols = item_count.div_ceil(rows);
    let ratio = cols as f64 / rows as f64;
    if ratio > MAX_GRID_RATIO {
        rows += 1;
        cols = item_count.div_ceil(rows);
    } else if ratio < 1.0 / MAX_GRID_RATIO {
        cols += 1;
        rows = item_count.div_ceil(cols);
    }
    (rows, cols)
}

/// Scale factor of the cell at `(row, col)` relative to the base cell
pub fn cell_scale(row: usize, col: usize, rows: usize, cols: usize) -> f64 {
    let center_row = (rows as f64 - 1.0) / 2.0;
    let center_col = (cols as f64 - 1.0) / 2.0;
    let distance = (row as f64 - center_row).abs() + (col as f64 - center_col).abs();
    (MAX_SCALE - SCALE_STEP * distance).clamp(MIN_SCALE, MAX_SCALE)
}

pub(crate) fn solve(request: &LayoutRequest) -> Layout {
    let item_count = request.item_count();
    let source_aspect = request.source_aspect_ratio();
    let (rows, cols) = base_grid(item_count);

    // Each line is as wide (or tall) as its largest occupied cell.
    let mut col_factor = vec![0.0f64; cols];
    let mut row_factor = vec![0.0f64; rows];
    for index in 0..item_count {
        let (row, col) = (index / cols, index % cols);
        let scale = cell_scale(row, col, rows, cols);
        col_factor[col] = col_factor[col].max(scale);
        row_factor[row] = row_factor[row].max(scale);
    }
    for factor in col_factor.iter_mut().chain(row_factor.iter_mut()) {
        if *factor == 0.0 {
            *factor = MIN_SCALE;
        }
    }

    let spacing = f64::from(SPACING_PX);
    let canvas_width = request.canvas_width();
    let available = f64::from(canvas_width) - (cols as f64 + 1.0) * spacing;
    let base_width = (available / col_factor.iter().sum::<f64>()).max(1.0);
    let base_height = (base_width / source_aspect).max(1.0);

    let slot_widths: Vec<u32> = col_factor.iter().map(|f| px(f * base_width)).collect();
    let slot_heights: Vec<u32> = row_factor.iter().map(|f| px(f * base_height)).collect();

    let grid_width =
        slot_widths.iter().sum::<u32>() + (cols as u32 - 1) * SPACING_PX;
    let canvas_height =
        slot_heights.iter().sum::<u32>() + (rows as u32 + 1) * SPACING_PX;
    let x0 = centered(canvas_width, grid_width);

    let mut slot_x = Vec::with_capacity(cols);
    let mut x = x0;
    for width in &slot_widths {
        slot_x.push(x);
        x += width + SPACING_PX;
    }
    let mut slot_y = Vec::with_capacity(rows);
    let mut y = SPACING_PX;
    for height in &slot_heights {
        slot_y.push(y);
        y += height + SPACING_PX;
    }

    let mut positions = Vec::with_capacity(item_count);
    let mut sizes = Vec::with_capacity(item_count);
    for index in 0..item_count {
        let (row, col) = (index / cols, index % cols);
        let scale = cell_scale(row, col, rows, cols);
        let cell = Size::new(
            px(scale * base_width).min(slot_widths[col]),
            px(scale * base_height).min(slot_heights[row]),
        );
        positions.push(Point::new(
            slot_x[col] + centered(slot_widths[col], cell.width),
            slot_y[row] + centered(slot_heights[row], cell.height),
        ));
        sizes.push(cell);
    }

    Layout::from_cells(
        LayoutAlgorithm::CenterEmphasis,
        rows as u32,
        cols as u32,
        Size::new(canvas_width, canvas_height),
        positions,
        sizes,
    )
}
