//! Compositor boundary: places frames on a canvas and produces the artifact.

use crate::error::CompositionError;
use crate::layout::{Point, Size};
use crate::services::frame_source::Frame;
use async_trait::async_trait;

/// Encoded mosaic ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub size: Size,
    /// File extension of the encoding, e.g. `png`
    pub format: String,
    pub data: Vec<u8>,
}

/// Pixel compositing collaborator
pub trait Compositor: Send + Sync {
    /// Allocate a canvas for one job
    fn begin(&self, canvas_size: Size) -> Result<Box<dyn Canvas>, CompositionError>;
}

/// A canvas owned by one job's runner
#[async_trait]
pub trait Canvas: Send {
    fn place(
        &mut self,
        index: usize,
        frame: &Frame,
        position: Point,
        size: Size,
    ) -> Result<(), CompositionError>;

    /// Called after each chunk of placements; the job waits here while the
    /// compositor catches up
    async fn flush(&mut self) -> Result<(), CompositionError> {
        Ok(())
    }

    fn finalize(&mut self) -> Result<Artifact, CompositionError>;
}
