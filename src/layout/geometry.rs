//! Integer pixel geometry shared by the layout algorithms.

use serde::{Deserialize, Serialize};

/// Top-left corner of a placed item, in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Display area available to the screen-fit algorithm.
///
/// `width` and `height` are physical pixels; `scale` is the backing scale
/// factor used to derive the minimum readable cell size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayBounds {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
}

impl DisplayBounds {
    pub const fn new(width: u32, height: u32, scale: f64) -> Self {
        Self {
            width,
            height,
            scale,
        }
    }
}

/// Floor a non-negative pixel measure, never returning less than one pixel.
pub(crate) fn px(value: f64) -> u32 {
    if value.is_finite() && value >= 1.0 {
        value.floor().min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Offset that centers `inner` inside `outer`, or zero when it does not fit.
pub(crate) fn centered(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}
