//! Persistence boundary and the file-backed reference sink.

use crate::error::PersistenceError;
use crate::job::JobId;
use crate::layout::LayoutAlgorithm;
use crate::services::compositor::Artifact;
use async_trait::async_trait;
use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Number of hex digits of the content hash kept in file names
const HASH_SUFFIX_LEN: usize = 12;

/// Where a saved artifact ended up
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactLocation(PathBuf);

impl ArtifactLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Naming inputs for a saved artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingInputs {
    pub job_id: JobId,
    pub file_stem: String,
    pub algorithm: LayoutAlgorithm,
    pub format: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save(
        &self,
        artifact: &Artifact,
        naming: &NamingInputs,
    ) -> Result<ArtifactLocation, PersistenceError>;
}

/// Writes artifacts into a directory as `{stem}_{algorithm}_{hash}.{format}`.
///
/// The hash is a blake3 digest of the artifact bytes, so saving identical
/// content twice lands on the same file.
#[derive(Debug, Clone)]
pub struct FilePersistenceSink {
    directory: PathBuf,
}

impl FilePersistenceSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name for an artifact; rejects stems that would escape the directory
    pub fn file_name(
        &self,
        artifact: &Artifact,
        naming: &NamingInputs,
    ) -> Result<String, PersistenceError> {
        let stem = naming.file_stem.trim();
        if stem.is_empty()
            || stem.contains(['/', '\\', '\0'])
            || stem == "."
            || stem == ".."
        {
            return Err(PersistenceError::InvalidName(naming.file_stem.clone()));
        }
        let format = if naming.format.is_empty() {
            artifact.format.as_str()
        } else {
            naming.format.as_str()
        };
        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PersistenceError::InvalidName(format!("format {:?}", format)));
        }

        let mut hasher = Hasher::new();
        hasher.update(&artifact.data);
        let digest = hasher.finalize().to_hex();
        Ok(format!(
            "{}_{}_{}.{}",
            stem,
            naming.algorithm.as_str(),
            &digest.as_str()[..HASH_SUFFIX_LEN],
            format
        ))
    }
}

#[async_trait]
impl PersistenceSink for FilePersistenceSink {
    async fn save(
        &self,
        artifact: &Artifact,
        naming: &NamingInputs,
    ) -> Result<ArtifactLocation, PersistenceError> {
        let file_name = self.file_name(artifact, naming)?;
        fs::create_dir_all(&self.directory).await.map_err(|e| {
            PersistenceError::Io(format!(
                "Failed to create output directory {:?}: {}",
                self.directory, e
            ))
        })?;

        let path = self.directory.join(&file_name);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &artifact.data).await.map_err(|e| {
            PersistenceError::Io(format!("Failed to write artifact to {:?}: {}", temp_path, e))
        })?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(PersistenceError::Io(format!(
                "Failed to rename temp file to {:?}: {}",
                path, e
            )));
        }

        debug!(job_id = %naming.job_id, path = %path.display(), bytes = artifact.data.len(), "Artifact saved");
        Ok(ArtifactLocation::new(path))
    }
}
