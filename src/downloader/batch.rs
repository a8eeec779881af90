//! Batch download of many projects into a directory

use super::ProjectDownloader;
use crate::error::{Error, Result};
use crate::metadata::{ProjectInfo, ProjectSource};
use crate::retry::with_retry;
use crate::types::{Event, ProjectId};
use crate::utils::{get_unique_path, sanitize_title};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// A project written to disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SavedProject {
    /// Project ID
    pub id: ProjectId,
    /// Final path
    pub path: PathBuf,
}

/// A project that could not be saved
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedProject {
    /// Project ID
    pub id: ProjectId,
    /// Pipeline stage that failed
    pub stage: String,
    /// Error message
    pub error: String,
}

/// Outcome of a batch download
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Projects written, in completion order
    pub saved: Vec<SavedProject>,
    /// Projects left alone because their file already existed
    pub skipped: Vec<ProjectId>,
    /// Projects that failed
    pub failed: Vec<FailedProject>,
}

impl BatchReport {
    /// Number of projects the batch looked at
    pub fn total(&self) -> usize {
        self.saved.len() + self.skipped.len() + self.failed.len()
    }
}

enum Outcome {
    Saved(SavedProject),
    Skipped(ProjectId),
    Failed(FailedProject),
}

impl ProjectDownloader {
    /// Download every project of `source` (up to `limit`) into the output directory
    ///
    /// Each project is loaded, assembled and written as `{title}.{extension}`,
    /// with the title sanitized for the file system. Up to
    /// `download.max_concurrent_projects` projects are in progress at once, all
    /// sharing the fetch queue. Retryable failures are retried per project; a
    /// project that still fails is reported and the batch carries on.
    ///
    /// # Errors
    /// Only listing the source or creating the output directory fails the batch.
    pub async fn download_to_dir(
        &self,
        source: &ProjectSource,
        limit: usize,
    ) -> Result<BatchReport> {
        let projects = self.list_projects(source, limit).await?;

        let output_dir = &self.config.download.output_dir;
        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create output directory '{}': {}",
                    output_dir.display(),
                    e
                ),
            ))
        })?;

        info!(%source, projects = projects.len(), "Starting batch download");

        // claiming a free file name and writing it must not interleave
        let write_lock = Mutex::new(());
        let outcomes: Vec<Outcome> = stream::iter(projects)
            .map(|info| self.save_project(info, &write_lock))
            .buffer_unordered(self.config.download.max_concurrent_projects.max(1))
            .collect()
            .await;

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Saved(saved) => report.saved.push(saved),
                Outcome::Skipped(id) => report.skipped.push(id),
                Outcome::Failed(failed) => report.failed.push(failed),
            }
        }

        info!(
            saved = report.saved.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Batch download finished"
        );
        Ok(report)
    }

    async fn save_project(&self, info: ProjectInfo, write_lock: &Mutex<()>) -> Outcome {
        let id = info.id;
        match self.try_save_project(&info, write_lock).await {
            Ok(Some(path)) => {
                self.emit_event(Event::ProjectSaved {
                    id,
                    path: path.clone(),
                });
                Outcome::Saved(SavedProject { id, path })
            }
            Ok(None) => {
                info!(project_id = %id, title = %info.title, "File already exists, skipping");
                Outcome::Skipped(id)
            }
            Err(e) => {
                error!(project_id = %id, error = %e, stage = e.stage(), "Project failed");
                self.emit_event(Event::ProjectFailed {
                    id,
                    stage: e.stage().to_string(),
                    error: e.to_string(),
                });
                Outcome::Failed(FailedProject {
                    id,
                    stage: e.stage().to_string(),
                    error: e.to_string(),
                })
            }
        }
    }

    async fn try_save_project(
        &self,
        info: &ProjectInfo,
        write_lock: &Mutex<()>,
    ) -> Result<Option<PathBuf>> {
        let mut archive = with_retry(&self.config.retry, || self.download(info.id, None)).await?;
        archive.title = self.file_title(info);

        let _guard = write_lock.lock().await;
        let desired = self.config.download.output_dir.join(archive.file_name());
        let Some(path) = get_unique_path(&desired, self.config.download.file_collision)? else {
            return Ok(None);
        };
        if path != desired {
            warn!(project_id = %info.id, path = %path.display(), "File name taken, renamed");
        }

        tokio::fs::write(&path, &archive.data).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write '{}': {}", path.display(), e),
            ))
        })?;

        Ok(Some(path))
    }

    fn file_title(&self, info: &ProjectInfo) -> String {
        let title = sanitize_title(info.title.trim());
        if self.config.download.use_project_titles && !title.is_empty() {
            title
        } else {
            info.id.to_string()
        }
    }
}
