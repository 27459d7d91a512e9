//! Screen fit: choose the grid that covers the most of the available display
//! while keeping every thumbnail above a readable minimum size.

use crate::layout::geometry::{px, DisplayBounds, Size};
use crate::layout::{grid_search, uniform_grid, Layout, LayoutAlgorithm, LayoutRequest};

/// Minimum readable cell width in points, multiplied by the display scale
pub const MIN_READABLE_WIDTH_PT: f64 = 160.0;
pub const SPACING_PX: u32 = 5;
const COVERAGE_WEIGHT: f64 = 0.6;
const READABILITY_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    rows: usize,
    cols: usize,
    cell_width: f64,
    cell_height: f64,
    score: f64,
}

pub(crate) fn solve(request: &LayoutRequest) -> Layout {
    let Some(display) = request.display() else {
        return grid_search::solve(request);
    };

    match best_grid(request.item_count(), request.source_aspect_ratio(), display) {
        Some(candidate) => {
            let item_count = request.item_count();
            let used_rows = item_count.div_ceil(candidate.cols);
            uniform_grid(
                LayoutAlgorithm::ScreenFit,
                used_rows as u32,
                candidate.cols as u32,
                item_count,
                Size::new(px(candidate.cell_width), px(candidate.cell_height)),
                SPACING_PX,
                Size::new(display.width, display.height),
            )
        }
        None => grid_search::solve(request),
    }
}

fn best_grid(item_count: usize, source_aspect: f64, display: DisplayBounds) -> Option<Candidate> {
    let spacing = f64::from(SPACING_PX);
    let display_width = f64::from(display.width);
    let display_height = f64::from(display.height);
    let display_area = display_width * display_height;
    let min_width = MIN_READABLE_WIDTH_PT * display.scale;
    let min_height = min_width / source_aspect;
    let min_area = min_width * min_height;

    let mut best: Option<Candidate> = None;
    for rows in 1..=item_count {
        let height_bound = (display_height - (rows as f64 + 1.0) * spacing) / rows as f64;
        if height_bound < min_height {
            // Adding rows only shrinks the height bound.
            break;
        }

        for cols in item_count.div_ceil(rows)..=item_count {
            let width_bound = (display_width - (cols as f64 + 1.0) * spacing) / cols as f64;
            let cell_width = width_bound.min(height_bound * source_aspect);
            let cell_height = cell_width / source_aspect;
            if cell_width < min_width || cell_height < min_height {
                // Cells never grow with more columns.
                break;
            }

            let coverage = (item_count as f64 * cell_width * cell_height / display_area).min(1.0);
            let readability = cell_width * cell_height / min_area;
            let score = COVERAGE_WEIGHT * coverage + READABILITY_WEIGHT * readability;

            if best.map_or(true, |b| score > b.score) {
                best = Some(Candidate {
                    rows,
                    cols,
                    cell_width,
                    cell_height,
                    score,
                });
            }
        }
    }

    best
}
