//! Single column ("compact") layout with a fixed canvas width and capped height.

use crate::layout::geometry::{centered, px, Point, Size};
use crate::layout::{Layout, LayoutAlgorithm, LayoutRequest};

pub const CANVAS_WIDTH_PX: u32 = 1200;
pub const MAX_CANVAS_HEIGHT_PX: u32 = 8000;
pub const SPACING_PX: u32 = 4;

pub(crate) fn solve(request: &LayoutRequest) -> Layout {
    let source_aspect = request.source_aspect_ratio();
    let mut cell = Size::new(
        CANVAS_WIDTH_PX - 2 * SPACING_PX,
        px(f64::from(CANVAS_WIDTH_PX - 2 * SPACING_PX) / source_aspect),
    );
    let max_cell_height = MAX_CANVAS_HEIGHT_PX - 2 * SPACING_PX;
    if cell.height > max_cell_height {
        // Very tall sources: shrink until one row fits.
        cell = Size::new(
            px(f64::from(max_cell_height) * source_aspect).min(cell.width),
            max_cell_height,
        );
    }

    let rows_that_fit =
        ((MAX_CANVAS_HEIGHT_PX - SPACING_PX) / (cell.height + SPACING_PX)).max(1) as usize;
    let placed = request.item_count().min(rows_that_fit);
    let canvas_height = placed as u32 * (cell.height + SPACING_PX) + SPACING_PX;
    let x = centered(CANVAS_WIDTH_PX, cell.width);

    let positions = (0..placed as u32)
        .map(|row| Point::new(x, SPACING_PX + row * (cell.height + SPACING_PX)))
        .collect();
    let sizes = vec![cell; placed];

    Layout::from_cells(
        LayoutAlgorithm::SingleColumn,
        placed as u32,
        1,
        Size::new(CANVAS_WIDTH_PX, canvas_height),
        positions,
        sizes,
    )
}
