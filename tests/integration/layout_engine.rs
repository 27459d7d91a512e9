//! Layout engine behavior through the public API

use mosaic::error::ConfigurationError;
use mosaic::layout::{compute_layout, try_compute_layout, DisplayBounds, Layout, LayoutAlgorithm, LayoutRequest};

fn request(algorithm: LayoutAlgorithm, item_count: i64) -> LayoutRequest {
    LayoutRequest::new(16.0 / 9.0, 16.0 / 9.0, item_count, 1920, algorithm, 1.0).unwrap()
}

fn assert_well_formed(layout: &Layout) {
    assert!(layout.placed_count >= 1, "{:?} placed nothing", layout.algorithm);
    assert_eq!(layout.positions.len(), layout.placed_count);
    assert_eq!(layout.sizes.len(), layout.placed_count);
    assert!(layout.fits_canvas(), "{:?} overflows its canvas", layout.algorithm);
}

#[test]
fn test_grid_search_twelve_items() {
    let layout = compute_layout(&request(LayoutAlgorithm::GridSearch, 12));

    assert_eq!(layout.algorithm, LayoutAlgorithm::GridSearch);
    assert!((12..=16).contains(&layout.placed_count));
    assert!(layout.rows as usize * layout.cols as usize >= 12);
    assert_well_formed(&layout);
}

#[test]
fn test_three_zone_below_floor_falls_back_to_grid_search() {
    let layout = compute_layout(&request(LayoutAlgorithm::ThreeZone, 3));

    assert_eq!(layout.algorithm, LayoutAlgorithm::GridSearch);
    assert!(layout.placed_count >= 4);
    assert_well_formed(&layout);
}

#[test]
fn test_every_algorithm_is_well_formed() {
    for algorithm in LayoutAlgorithm::ALL {
        for count in [1, 2, 7, 12, 48, 150] {
            let layout = compute_layout(&request(algorithm, count));
            assert_well_formed(&layout);
        }
    }
}

#[test]
fn test_every_algorithm_is_deterministic() {
    for algorithm in LayoutAlgorithm::ALL {
        let req = request(algorithm, 37);
        let first = serde_json::to_vec(&compute_layout(&req)).unwrap();
        let second = serde_json::to_vec(&compute_layout(&req)).unwrap();
        assert_eq!(first, second, "{} is not deterministic", algorithm);
    }
}

#[test]
fn test_screen_fit_uses_display_bounds() {
    let req = request(LayoutAlgorithm::ScreenFit, 12)
        .with_display(DisplayBounds::new(1920, 1080, 1.0))
        .unwrap();
    let layout = compute_layout(&req);

    assert_eq!(layout.algorithm, LayoutAlgorithm::ScreenFit);
    assert_eq!(layout.placed_count, 12);
    assert_well_formed(&layout);
}

#[test]
fn test_screen_fit_without_display_falls_back() {
    let layout = compute_layout(&request(LayoutAlgorithm::ScreenFit, 12));
    assert_eq!(layout.algorithm, LayoutAlgorithm::GridSearch);
    assert_well_formed(&layout);
}

#[test]
fn test_portrait_and_ultrawide_sources() {
    for source_aspect in [9.0 / 16.0, 21.0 / 9.0, 4.0 / 3.0] {
        for algorithm in LayoutAlgorithm::ALL {
            let req =
                LayoutRequest::new(source_aspect, 16.0 / 9.0, 24, 1600, algorithm, 1.5).unwrap();
            assert_well_formed(&compute_layout(&req));
        }
    }
}

#[test]
fn test_try_compute_layout_succeeds() {
    let layout = try_compute_layout(&request(LayoutAlgorithm::CenterEmphasis, 9)).unwrap();
    assert_eq!(layout.algorithm, LayoutAlgorithm::CenterEmphasis);
}

#[test]
fn test_invalid_requests_are_configuration_errors() {
    let bad_aspect = LayoutRequest::new(0.0, 16.0 / 9.0, 12, 1920, LayoutAlgorithm::GridSearch, 1.0);
    assert!(matches!(
        bad_aspect,
        Err(ConfigurationError::InvalidAspectRatio { .. })
    ));

    let bad_count = LayoutRequest::new(1.5, 1.5, 0, 1920, LayoutAlgorithm::GridSearch, 1.0);
    assert_eq!(bad_count.unwrap_err(), ConfigurationError::InvalidItemCount(0));

    let bad_width = LayoutRequest::new(1.5, 1.5, 4, -10, LayoutAlgorithm::GridSearch, 1.0);
    assert_eq!(bad_width.unwrap_err(), ConfigurationError::InvalidCanvasWidth(-10));

    let bad_display = request(LayoutAlgorithm::ScreenFit, 4).with_display(DisplayBounds::new(0, 1080, 1.0));
    assert!(matches!(bad_display, Err(ConfigurationError::InvalidDisplay(_))));
}

#[test]
fn test_layout_serializes_algorithm_in_snake_case() {
    let layout = compute_layout(&request(LayoutAlgorithm::SingleColumn, 3));
    let json = serde_json::to_value(&layout).unwrap();
    assert_eq!(json["algorithm"], "single_column");
    assert_eq!(json["placed_count"], 3);
}
