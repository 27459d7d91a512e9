//! Chunked compositing of extracted frames onto the job's canvas.

use crate::error::{CompositionError, JobError};
use crate::layout::Layout;
use crate::progress::{Phase, ProgressReporter};
use crate::runner::extraction::FrameSlot;
use crate::services::{Artifact, Compositor};
use tokio_util::sync::CancellationToken;

/// Place every slot at its layout cell, flushing after each chunk.
///
/// Frames are released as soon as they are placed.
pub async fn composite(
    compositor: &dyn Compositor,
    layout: &Layout,
    slots: &mut [FrameSlot],
    chunk_size: usize,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<Artifact, JobError> {
    reporter.advance(Phase::Compositing);
    let total = slots.len();
    let mut canvas = compositor.begin(layout.canvas_size)?;

    let mut placed = 0usize;
    for chunk in slots.chunks_mut(chunk_size.max(1)) {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        for slot in chunk.iter_mut() {
            let index = slot.index;
            let frame = slot.frame().ok_or_else(|| CompositionError::Placement {
                index,
                message: "no frame extracted for slot".to_string(),
            })?;
            canvas.place(index, frame, layout.positions[index], layout.sizes[index])?;
            slot.mark_placed();
        }
        canvas.flush().await?;
        placed += chunk.len();
        reporter.fraction(Phase::Compositing, placed, total);
        tokio::task::yield_now().await;
    }

    if cancel.is_cancelled() {
        return Err(JobError::Cancelled);
    }
    Ok(canvas.finalize()?)
}
