//! Manifest-specific project loaders
//!
//! One loader per manifest generation, each a plain async function over a
//! [`LoadContext`]:
//! - [`sb`] - Scratch 1.x, a single binary file
//! - [`sb2`] - Scratch 2.0, JSON manifest with sequentially numbered assets, or a zip
//! - [`sb3`] - Scratch 3.0, JSON manifest with content-addressed assets
//!
//! Every fetch a loader makes is reported as a progress task that finishes
//! whether or not the fetch succeeded.

pub mod sb;
pub mod sb2;
pub mod sb3;


use crate::config::{Config, EndpointConfig};
use crate::error::{Error, Result};
use crate::fetch::FetchQueue;
use crate::format;
use crate::progress::Progress;
use crate::types::{LoadedProject, ProjectFormat, ProjectId};
use std::sync::Arc;
use tracing::warn;

/// Everything a loader needs: the fetch queue, settings and a progress reporter
#[derive(Clone, Debug)]
pub struct LoadContext {
    queue: FetchQueue,
    config: Arc<Config>,
    progress: Progress,
}

impl LoadContext {
    /// Create a context for one load
    pub fn new(queue: FetchQueue, config: Arc<Config>, progress: Progress) -> Self {
        Self {
            queue,
            config,
            progress,
        }
    }

    /// Settings for this load
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Endpoint templates
    pub fn endpoints(&self) -> &EndpointConfig {
        &self.config.endpoints
    }

    /// Progress reporter of this load
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Fetch a manifest or other body as one progress task
    ///
    /// # Errors
    /// [`Error::Transport`] on network failure or a non-2xx status
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let task = self.progress.task(url);
        let response = self.queue.enqueue(url).await?.ensure_success()?;
        task.succeed();
        Ok(response.into_bytes())
    }

    /// Fetch an asset as one progress task, verifying its hash when configured
    ///
    /// # Errors
    /// [`Error::Transport`] as for [`LoadContext::fetch`];
    /// [`Error::CorruptAsset`] if verification is on and the content does not
    /// hash to the key
    pub async fn fetch_asset(&self, key: &str, url: &str) -> Result<Vec<u8>> {
        let task = self.progress.task(url);
        let data = self.queue.enqueue(url).await?.ensure_success()?.into_bytes();
        if self.config.fetch.verify_asset_hashes {
            verify_asset(key, &data)?;
        }
        task.succeed();
        Ok(data)
    }
}

/// Check that `data` hashes to the md5 at the front of `key`
///
/// Keys whose stem is not a 32-digit hex md5 are not checked.
pub fn verify_asset(key: &str, data: &[u8]) -> Result<()> {
    let expected = key.split('.').next().unwrap_or(key);
    if expected.len() != 32 || !expected.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(());
    }

    let actual = format!("{:x}", md5::compute(data));
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        warn!(key, actual = %actual, "Asset content does not match its hash");
        Err(Error::CorruptAsset {
            key: key.to_string(),
            actual,
        })
    }
}

/// Load a project with the loader for `format`
pub async fn load_project(
    ctx: &LoadContext,
    id: ProjectId,
    format: ProjectFormat,
) -> Result<LoadedProject> {
    match format {
        ProjectFormat::Sb => sb::load(ctx, id).await,
        ProjectFormat::Sb2 => sb2::load(ctx, id).await,
        ProjectFormat::Sb3 => sb3::load(ctx, id).await,
    }
}

/// Load a project, detecting its format when none is given
pub async fn load_any(
    ctx: &LoadContext,
    id: ProjectId,
    format: Option<ProjectFormat>,
) -> Result<LoadedProject> {
    match format {
        Some(format) => load_project(ctx, id, format).await,
        None => format::load_detected(ctx, id).await,
    }
}
