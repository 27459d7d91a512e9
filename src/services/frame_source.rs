//! Frame source boundary: probing a source and fetching decoded frames.

use crate::error::SourceError;
use crate::job::InputDescriptor;
use crate::layout::Size;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// What analysis learns about a source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

impl SourceInfo {
    pub fn new(duration_secs: f64, width: u32, height: u32) -> Self {
        Self {
            duration_secs,
            width,
            height,
        }
    }

    /// Width over height, or `None` for degenerate dimensions
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(f64::from(self.width) / f64::from(self.height))
    }
}

/// One frame to fetch, identified by its layout slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    pub index: usize,
    pub timestamp_secs: f64,
}

/// A decoded frame as handed to the compositor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub size: Size,
    pub data: Vec<u8>,
    pub placeholder: bool,
}

impl Frame {
    pub fn new(size: Size, data: Vec<u8>) -> Self {
        Self {
            size,
            data,
            placeholder: false,
        }
    }

    /// Blank substitute for a frame that could not be fetched
    pub fn placeholder(size: Size) -> Self {
        Self {
            size,
            data: Vec::new(),
            placeholder: true,
        }
    }
}

/// Result for one requested index. Outcomes may arrive in any order.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub index: usize,
    pub result: Result<Frame, SourceError>,
}

impl FetchOutcome {
    pub fn fetched(index: usize, frame: Frame) -> Self {
        Self {
            index,
            result: Ok(frame),
        }
    }

    pub fn failed(index: usize, error: SourceError) -> Self {
        Self {
            index,
            result: Err(error),
        }
    }
}

/// Stream of fetch outcomes for one batch of requests
pub type FrameStream<'a> = Pin<Box<dyn Stream<Item = FetchOutcome> + Send + 'a>>;

/// Media decoding collaborator
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Read duration and dimensions of the source
    async fn probe(&self, input: &InputDescriptor) -> Result<SourceInfo, SourceError>;

    /// Fetch a batch of frames. Indices may fail individually, arrive out of
    /// order, or be missing from the stream altogether.
    fn fetch<'a>(&'a self, input: &'a InputDescriptor, requests: Vec<FrameRequest>)
        -> FrameStream<'a>;
}
