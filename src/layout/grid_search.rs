//! Classic grid search: try every row count, keep the grid that best fills the
//! canvas height while placing close to the requested number of items.

use crate::layout::geometry::{px, Size};
use crate::layout::{uniform_grid, Layout, LayoutAlgorithm, LayoutRequest};

/// Fixed spacing between cells and around the grid edge
pub const SPACING_PX: u32 = 5;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    rows: usize,
    cols: usize,
    cell_width: f64,
    cell_height: f64,
    score: f64,
}

pub(crate) fn solve(request: &LayoutRequest) -> Layout {
    search(
        request.item_count(),
        request.source_aspect_ratio(),
        Size::new(request.canvas_width(), request.canvas_height()),
    )
}

/// Grid search over an explicit canvas; shared with the fallbacks of the other algorithms.
pub(crate) fn search(item_count: usize, source_aspect: f64, canvas: Size) -> Layout {
    let item_count = item_count.max(1);
    let spacing = f64::from(SPACING_PX);
    let canvas_width = f64::from(canvas.width);
    let canvas_height = f64::from(canvas.height);
    let mut best: Option<Candidate> = None;

    for rows in 1..=item_count {
        let cols = item_count.div_ceil(rows);
        let available_width = canvas_width - (cols as f64 + 1.0) * spacing;
        if available_width < cols as f64 {
            // Cells narrower than a pixel; more rows means fewer columns, keep going.
            continue;
        }

        let mut cell_width = available_width / cols as f64;
        let mut cell_height = cell_width / source_aspect;
        let mut total_height = rows as f64 * cell_height + (rows as f64 + 1.0) * spacing;
        let overflows = total_height > canvas_height;
        if overflows {
            let available_height = canvas_height - (rows as f64 + 1.0) * spacing;
            if available_height < rows as f64 {
                break;
            }
            cell_height = available_height / rows as f64;
            cell_width = cell_height * source_aspect;
            total_height = canvas_height;
        }

        let fill_ratio = (total_height / canvas_height).min(1.0);
        let placed = rows * cols;
        let score = (1.0 - fill_ratio)
            + (placed as f64 - item_count as f64).abs() / item_count as f64;

        if best.map_or(true, |b| score < b.score) {
            best = Some(Candidate {
                rows,
                cols,
                cell_width,
                cell_height,
                score,
            });
        }

        // Taller grids only overflow further.
        if overflows {
            break;
        }
    }

    match best {
        Some(candidate) => uniform_grid(
            LayoutAlgorithm::GridSearch,
            candidate.rows as u32,
            candidate.cols as u32,
            candidate.rows * candidate.cols,
            Size::new(px(candidate.cell_width), px(candidate.cell_height)),
            SPACING_PX,
            canvas,
        ),
        None => degenerate(item_count, source_aspect, canvas),
    }
}

/// Canvas too small for any spaced grid: a single column of the smallest cells.
fn degenerate(item_count: usize, source_aspect: f64, canvas: Size) -> Layout {
    let cell_height = px(f64::from(canvas.height) / item_count as f64);
    let cell = Size::new(px(f64::from(cell_height) * source_aspect), cell_height);
    uniform_grid(
        LayoutAlgorithm::GridSearch,
        item_count as u32,
        1,
        item_count,
        cell,
        0,
        canvas,
    )
}
