//! Project downloader facade
//!
//! [`ProjectDownloader`] owns the shared fetch queue and the event channel and
//! exposes the pipeline stages as methods:
//! - loading a project (with a known format or detected)
//! - assembling the archive
//! - project metadata and listings
//! - [`batch`] - downloading many projects to a directory

pub mod batch;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use batch::{BatchReport, FailedProject, SavedProject};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{FetchQueue, HttpTransport, Transport};
use crate::format;
use crate::loader::{self, LoadContext};
use crate::metadata::{self, ProjectInfo, ProjectSource};
use crate::progress::Progress;
use crate::types::{Event, FormatTag, LoadedProject, ProjectArchive, ProjectFormat, ProjectId};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Capacity of the event channel; slow subscribers miss the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are Arc-backed)
///
/// All loads started from one instance share its fetch queue, so the request
/// cap holds across concurrent loads. Events go only to this instance's
/// subscribers.
#[derive(Clone)]
pub struct ProjectDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Bounded queue every request goes through
    pub(crate) queue: FetchQueue,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl ProjectDownloader {
    /// Create a downloader talking to the configured hosts over HTTP
    ///
    /// # Errors
    /// [`Error::Config`] if the configuration is invalid
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.fetch)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a downloader over a custom transport
    ///
    /// # Errors
    /// [`Error::Config`] if the configuration is invalid
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let queue = FetchQueue::new(transport, config.fetch.max_concurrent_requests);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            queue,
            event_tx,
        })
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The shared fetch queue
    pub fn queue(&self) -> &FetchQueue {
        &self.queue
    }

    /// Emit an event to all subscribers
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// A fresh load context with its own progress counter
    pub fn context(&self, id: ProjectId) -> LoadContext {
        LoadContext::new(
            self.queue.clone(),
            Arc::clone(&self.config),
            Progress::new(id, self.event_tx.clone()),
        )
    }

    /// Detect a project's manifest format
    pub async fn detect(&self, id: ProjectId) -> Result<FormatTag> {
        format::detect(&self.context(id), id).await
    }

    /// Load a project, detecting its format
    pub async fn load(&self, id: ProjectId) -> Result<LoadedProject> {
        let project = loader::load_any(&self.context(id), id, None).await?;
        self.loaded(id, &project);
        Ok(project)
    }

    /// Load a project with the loader for `format`, without detection
    pub async fn load_as(&self, id: ProjectId, format: ProjectFormat) -> Result<LoadedProject> {
        let project = loader::load_project(&self.context(id), id, format).await?;
        self.loaded(id, &project);
        Ok(project)
    }

    /// Load with a format hint, following a format mismatch's suggestion once
    ///
    /// Without a hint this is [`ProjectDownloader::load`].
    pub async fn load_with_hint(
        &self,
        id: ProjectId,
        hint: Option<ProjectFormat>,
    ) -> Result<LoadedProject> {
        let Some(format) = hint else {
            return self.load(id).await;
        };

        match self.load_as(id, format).await {
            Err(e) => match e.probable_format() {
                Some(suggested) if suggested != format => {
                    warn!(
                        project_id = %id,
                        %format,
                        %suggested,
                        error = %e,
                        "Format hint was wrong, retrying with suggested loader"
                    );
                    self.load_as(id, suggested).await
                }
                _ => Err(e),
            },
            ok => ok,
        }
    }

    fn loaded(&self, id: ProjectId, project: &LoadedProject) {
        let files = project.files().map_or(1, |files| files.len());
        info!(
            project_id = %id,
            extension = project.extension(),
            files,
            "Project loaded"
        );
        self.emit_event(Event::Loaded { id, files });
    }

    /// Assemble a loaded project into its distributable file
    ///
    /// Compression runs on the blocking thread pool; progress is reported as
    /// [`Event::Archiving`].
    pub async fn archive(&self, id: ProjectId, project: LoadedProject) -> Result<ProjectArchive> {
        let event_tx = self.event_tx.clone();
        tokio::task::spawn_blocking(move || {
            project.into_archive(|progress| {
                event_tx.send(Event::Archiving { id, progress }).ok();
            })
        })
        .await
        .map_err(|e| Error::Other(format!("archive task failed: {}", e)))?
    }

    /// Load and assemble a project in one step
    pub async fn download(
        &self,
        id: ProjectId,
        hint: Option<ProjectFormat>,
    ) -> Result<ProjectArchive> {
        let project = self.load_with_hint(id, hint).await?;
        self.archive(id, project).await
    }

    /// Fetch a project's public metadata
    pub async fn project_info(&self, id: ProjectId) -> Result<ProjectInfo> {
        metadata::fetch_project_info(&self.queue, &self.config.endpoints, id).await
    }

    /// List up to `limit` projects of a user, a studio, or a single project
    pub async fn list_projects(
        &self,
        source: &ProjectSource,
        limit: usize,
    ) -> Result<Vec<ProjectInfo>> {
        metadata::list_projects(&self.queue, &self.config.endpoints, source, limit).await
    }
}

impl std::fmt::Debug for ProjectDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectDownloader")
            .field("queue", &self.queue)
            .field("subscribers", &self.event_tx.receiver_count())
            .finish()
    }
}
