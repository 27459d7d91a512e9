//! External collaborators of the job pipeline.
//!
//! Decoding, pixel compositing and encoding live outside this crate; the
//! pipeline only talks to them through these traits. Host resource probing
//! and file persistence have reference implementations here.

pub mod compositor;
pub mod frame_source;
pub mod persistence;
pub mod resources;

pub use compositor::{Artifact, Canvas, Compositor};
pub use frame_source::{FetchOutcome, Frame, FrameRequest, FrameSource, FrameStream, SourceInfo};
pub use persistence::{ArtifactLocation, FilePersistenceSink, NamingInputs, PersistenceSink};
pub use resources::{ResourcePool, StaticResourcePool, SystemResourcePool};

use std::sync::Arc;

/// Collaborator set shared by every job of a coordinator
#[derive(Clone)]
pub struct Services {
    pub frame_source: Arc<dyn FrameSource>,
    pub compositor: Arc<dyn Compositor>,
    pub persistence: Arc<dyn PersistenceSink>,
    pub resources: Arc<dyn ResourcePool>,
}

impl Services {
    pub fn new(
        frame_source: Arc<dyn FrameSource>,
        compositor: Arc<dyn Compositor>,
        persistence: Arc<dyn PersistenceSink>,
        resources: Arc<dyn ResourcePool>,
    ) -> Self {
        Self {
            frame_source,
            compositor,
            persistence,
            resources,
        }
    }
}
