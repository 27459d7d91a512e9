//! Source analysis: thumbnail count derivation and timestamp sampling.

/// Smallest thumbnail count a job ever requests
pub const MIN_ITEM_COUNT: usize = 4;
/// Largest derived thumbnail count
pub const MAX_ITEM_COUNT: usize = 800;
/// Sources shorter than this get the minimum count
pub const SHORT_SOURCE_SECS: f64 = 5.0;
const WIDTH_PER_ITEM_PX: f64 = 200.0;
const DURATION_WEIGHT: f64 = 10.0;
const MAX_EDGE_MARGIN: f64 = 0.45;

/// Thumbnail count for a source: grows with canvas width and with the log of
/// the duration, scaled by the density factor.
pub fn derive_item_count(duration_secs: f64, canvas_width: u32, density: f64) -> usize {
    if duration_secs.is_nan() || duration_secs < SHORT_SOURCE_SECS {
        return MIN_ITEM_COUNT;
    }
    let base = f64::from(canvas_width) / WIDTH_PER_ITEM_PX;
    let raw = ((base + DURATION_WEIGHT * duration_secs.ln()) * density).round();
    if !raw.is_finite() {
        return MIN_ITEM_COUNT;
    }
    raw.clamp(MIN_ITEM_COUNT as f64, MAX_ITEM_COUNT as f64) as usize
}

/// `count` timestamps spread evenly across the source, skipping
/// `edge_margin` of the duration at each end. Each sample sits at the middle
/// of its interval.
pub fn sample_timestamps(duration_secs: f64, count: usize, edge_margin: f64) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return vec![0.0; count];
    }
    let margin = if edge_margin.is_finite() {
        edge_margin.clamp(0.0, MAX_EDGE_MARGIN)
    } else {
        0.0
    };
    let start = duration_secs * margin;
    let usable = duration_secs * (1.0 - 2.0 * margin);
    let step = usable / count as f64;
    (0..count)
        .map(|i| start + step * (i as f64 + 0.5))
        .collect()
}
