//! Property-based tests for determinism guarantees

use mosaic::layout::{compute_layout, DisplayBounds, LayoutAlgorithm, LayoutRequest};
use mosaic::runner::analysis::{derive_item_count, sample_timestamps};
use proptest::prelude::*;

fn any_algorithm() -> impl Strategy<Value = LayoutAlgorithm> {
    prop::sample::select(LayoutAlgorithm::ALL.to_vec())
}

/// Test that identical requests serialize to identical layouts
#[test]
fn test_layout_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                0.3f64..4.0,
                0.5f64..3.5,
                1i64..200,
                100i64..4000,
                any_algorithm(),
                0.25f64..3.0,
            ),
            |(source, target, count, width, algorithm, density)| {
                let request =
                    LayoutRequest::new(source, target, count, width, algorithm, density).unwrap();
                let first = serde_json::to_vec(&compute_layout(&request)).unwrap();
                let second = serde_json::to_vec(&compute_layout(&request.clone())).unwrap();
                prop_assert_eq!(first, second);
                Ok(())
            },
        )
        .unwrap();
}

/// Test that screen fit is deterministic for a given display
#[test]
fn test_screen_fit_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(1i64..120, 640u32..5120, 480u32..2880, 1u32..4),
            |(count, width, height, scale)| {
                let request = LayoutRequest::new(
                    16.0 / 9.0,
                    16.0 / 9.0,
                    count,
                    1920,
                    LayoutAlgorithm::ScreenFit,
                    1.0,
                )
                .unwrap()
                .with_display(DisplayBounds::new(width, height, f64::from(scale)))
                .unwrap();
                prop_assert_eq!(compute_layout(&request), compute_layout(&request));
                Ok(())
            },
        )
        .unwrap();
}

/// Test that the pipeline's count and sampling arithmetic is a pure function
#[test]
fn test_sampling_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(0.0f64..20_000.0, 200u32..8000, 0.1f64..4.0, 0.0f64..0.45),
            |(duration, width, density, margin)| {
                let count = derive_item_count(duration, width, density);
                prop_assert_eq!(count, derive_item_count(duration, width, density));
                prop_assert_eq!(
                    sample_timestamps(duration, count, margin),
                    sample_timestamps(duration, count, margin)
                );
                Ok(())
            },
        )
        .unwrap();
}
