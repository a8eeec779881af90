//! # scratch-dl
//!
//! Library for downloading Scratch projects as standalone `.sb`, `.sb2` and
//! `.sb3` files.
//!
//! ## Design Philosophy
//!
//! scratch-dl is designed to be:
//! - **Polite** - Every request goes through one bounded, first-come-first-served queue
//! - **Deterministic** - The same project always produces byte-identical archives
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to progress events, no polling required
//!
//! ## Pipeline
//!
//! 1. [`format`] detects which generation of manifest the host serves
//! 2. a [`loader`] fetches the manifest and its assets, deduplicating shared assets
//! 3. [`sort`] puts the files in a canonical order
//! 4. [`archive`] zips them into the distributable file
//!
//! ## Quick Start
//!
//! ```no_run
//! use scratch_dl::{Config, ProjectDownloader, ProjectId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = ProjectDownloader::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let archive = downloader.download(ProjectId(10128407), None).await?;
//!     tokio::fs::write(archive.file_name(), &archive.data).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Zip assembly of loaded projects
pub mod archive;
/// Asset reference collection, deduplication and legacy ID rewriting
pub mod assets;
/// Configuration types
pub mod config;
/// Downloader facade and batch downloads
pub mod downloader;
/// Error types
pub mod error;
/// Bounded request queue and HTTP transport
pub mod fetch;
/// Manifest format detection
pub mod format;
/// Per-format project loaders
pub mod loader;
/// Project metadata and listings
pub mod metadata;
/// Per-load progress reporting
pub mod progress;
/// Retry logic with exponential backoff
pub mod retry;
/// Canonical file ordering
pub mod sort;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use config::{Config, EndpointConfig, FetchConfig, FileCollisionAction, LegacyIdOrder};
pub use downloader::{BatchReport, FailedProject, ProjectDownloader, SavedProject};
pub use error::{Error, Result};
pub use fetch::{FetchQueue, HttpTransport, RawResponse, Transport};
pub use loader::LoadContext;
pub use metadata::{ProjectInfo, ProjectSource};
pub use types::{
    ArchiveProgress, Event, FormatTag, LoadedProject, ProjectArchive, ProjectFile, ProjectFormat,
    ProjectId,
};
