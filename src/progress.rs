//! Per-load progress accounting
//!
//! Every unit of fetch work (the manifest, each asset) is a task. A task emits
//! [`Event::TaskStarted`] when it is created and [`Event::TaskFinished`] when its
//! [`TaskGuard`] is dropped, so a failed or cancelled fetch still closes its task
//! and the outstanding count returns to zero.
//!
//! A [`Progress`] belongs to one load; concurrent loads each get their own
//! counter while sharing the downloader's event channel.

use crate::types::{Event, ProjectFormat, ProjectId};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Progress reporter for a single project load
#[derive(Clone, Debug)]
pub struct Progress {
    id: ProjectId,
    events: broadcast::Sender<Event>,
    outstanding: Arc<AtomicUsize>,
}

impl Progress {
    /// Create a reporter for `id` emitting on `events`
    pub fn new(id: ProjectId, events: broadcast::Sender<Event>) -> Self {
        Self {
            id,
            events,
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A reporter nobody listens to
    pub fn detached(id: ProjectId) -> Self {
        let (events, _rx) = broadcast::channel(16);
        Self::new(id, events)
    }

    /// Project this reporter belongs to
    pub fn project_id(&self) -> ProjectId {
        self.id
    }

    /// Tasks started but not yet finished
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Emit an event; having no subscribers is not an error
    pub fn emit(&self, event: Event) {
        self.events.send(event).ok();
    }

    /// Announce that a loader has started
    pub fn load_started(&self, format: Option<ProjectFormat>) {
        self.emit(Event::LoadStarted {
            id: self.id,
            format,
        });
    }

    /// Start a task for fetching `url`
    pub fn task(&self, url: &str) -> TaskGuard {
        let outstanding = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(Event::TaskStarted {
            id: self.id,
            url: url.to_string(),
            outstanding,
        });
        TaskGuard {
            progress: self.clone(),
            url: url.to_string(),
            success: false,
        }
    }
}

/// An open task; finishes when dropped
///
/// Dropped without [`TaskGuard::succeed`], the task is reported as failed.
#[must_use = "dropping the guard immediately finishes the task"]
#[derive(Debug)]
pub struct TaskGuard {
    progress: Progress,
    url: String,
    success: bool,
}

impl TaskGuard {
    /// Finish the task successfully
    pub fn succeed(mut self) {
        self.success = true;
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let outstanding = self.progress.outstanding.fetch_sub(1, Ordering::SeqCst) - 1;
        self.progress.emit(Event::TaskFinished {
            id: self.progress.id,
            url: std::mem::take(&mut self.url),
            success: self.success,
            outstanding,
        });
    }
}
