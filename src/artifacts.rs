// src/artifacts.rs
//! On-disk artifacts produced by pipeline stages.
//!
//! Intermediate artifacts live under `<work_root>/<job_id>/` and belong to the
//! orchestration run that created them. Final videos are promoted into
//! `<output_root>/<job_id>.mp4` and belong to the job record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::types::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Narration,
    SceneImage,
    Captions,
    Video,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Narration => "narration",
            ArtifactKind::SceneImage => "scene_image",
            ArtifactKind::Captions => "captions",
            ArtifactKind::Video => "video",
        };
        f.write_str(name)
    }
}

/// Reference to a generated byte stream on persistent storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub job_id: JobId,
    pub path: PathBuf,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, job_id: &str, path: PathBuf) -> Self {
        Self {
            kind,
            job_id: job_id.to_string(),
            path,
        }
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Delete the backing file. A file that is already gone is not an error.
    pub async fn remove(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Allocates artifact paths and owns the storage layout
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    work_root: PathBuf,
    output_root: PathBuf,
}

impl ArtifactStore {
    pub fn new(work_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
            output_root: output_root.into(),
        }
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.work_root.join(job_id)
    }

    pub fn final_video_path(&self, job_id: &str) -> PathBuf {
        self.output_root.join(format!("{}.mp4", job_id))
    }

    /// Create the job's scratch directory and the output directory
    pub async fn prepare(&self, job_id: &str) -> std::io::Result<()> {
        fs::create_dir_all(self.job_dir(job_id)).await?;
        fs::create_dir_all(&self.output_root).await?;
        Ok(())
    }

    /// Reserve a path in the job's scratch directory without writing anything
    pub fn allocate(&self, job_id: &str, kind: ArtifactKind, file_name: &str) -> Artifact {
        Artifact::new(kind, job_id, self.job_dir(job_id).join(file_name))
    }

    /// Write bytes into the job's scratch directory
    pub async fn write(
        &self,
        job_id: &str,
        kind: ArtifactKind,
        file_name: &str,
        bytes: &[u8],
    ) -> std::io::Result<Artifact> {
        let artifact = self.allocate(job_id, kind, file_name);
        fs::write(&artifact.path, bytes).await?;
        Ok(artifact)
    }

    /// Move a composed video out of scratch space into the output directory
    pub async fn promote(&self, artifact: &Artifact) -> std::io::Result<Artifact> {
        let destination = self.final_video_path(&artifact.job_id);
        fs::create_dir_all(&self.output_root).await?;

        if fs::rename(&artifact.path, &destination).await.is_err() {
            // Cross-device moves cannot be renamed
            fs::copy(&artifact.path, &destination).await?;
            artifact.remove().await?;
        }

        Ok(Artifact::new(ArtifactKind::Video, &artifact.job_id, destination))
    }

    /// Remove the job's scratch directory and anything left inside it
    pub async fn discard_job_dir(&self, job_id: &str) {
        let dir = self.job_dir(job_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(job_id = %job_id, "Could not remove work dir {}: {}", dir.display(), e),
        }
    }
}
