//! Job progress primitives.

pub mod event;
pub mod reporter;

pub use event::{Phase, ProgressCallback, ProgressEvent};
pub use reporter::ProgressReporter;
