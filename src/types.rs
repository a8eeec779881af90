//! Core types for scratch-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Identifier of a project on the remote host
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl ProjectId {
    /// Create a new ProjectId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ProjectId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ProjectId> for u64 {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Project file format, named after the archive extension it produces
///
/// Each variant has its own loader:
/// - `Sb` - Scratch 1.x binary project, served whole
/// - `Sb2` - Scratch 2.0 project (JSON manifest + assets, or a binary archive)
/// - `Sb3` - Scratch 3.0 project (JSON manifest + content-addressed assets)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectFormat {
    /// Scratch 1.x
    Sb,
    /// Scratch 2.0
    Sb2,
    /// Scratch 3.0
    Sb3,
}

impl ProjectFormat {
    /// File extension (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            ProjectFormat::Sb => "sb",
            ProjectFormat::Sb2 => "sb2",
            ProjectFormat::Sb3 => "sb3",
        }
    }
}

impl std::fmt::Display for ProjectFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ProjectFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "sb" => Ok(ProjectFormat::Sb),
            "sb2" => Ok(ProjectFormat::Sb2),
            "sb3" => Ok(ProjectFormat::Sb3),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

/// What the format detector observed in a manifest body
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatTag {
    /// Binary body with the Scratch 1.x signature
    LegacyBinary,
    /// Binary body with the zip signature (Scratch 2.0 uploaded as a file)
    MidBinary,
    /// JSON body from the Scratch 2.0 generation (has `objName`)
    MidJson,
    /// JSON body from the Scratch 3.0 generation (has `targets`)
    Current,
}

impl FormatTag {
    /// The loader variant that handles this tag
    pub fn format(&self) -> ProjectFormat {
        match self {
            FormatTag::LegacyBinary => ProjectFormat::Sb,
            FormatTag::MidBinary | FormatTag::MidJson => ProjectFormat::Sb2,
            FormatTag::Current => ProjectFormat::Sb3,
        }
    }
}

/// A single file of a multi-file project
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectFile {
    /// Path inside the archive
    pub path: String,
    /// File contents
    pub data: Vec<u8>,
}

impl ProjectFile {
    /// Create a new project file
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }
}

/// Normalized output of a loader
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadedProject {
    /// The host served the whole project as one opaque file
    Buffer {
        /// Project title
        title: String,
        /// Archive extension (`sb` or `sb2`)
        extension: String,
        /// Raw file contents
        data: Vec<u8>,
    },
    /// The project was reassembled from a manifest and its assets
    Files {
        /// Project title
        title: String,
        /// Archive extension (`sb2` or `sb3`)
        extension: String,
        /// Sorted file list, `project.json` first
        files: Vec<ProjectFile>,
    },
}

impl LoadedProject {
    /// Project title
    pub fn title(&self) -> &str {
        match self {
            LoadedProject::Buffer { title, .. } | LoadedProject::Files { title, .. } => title,
        }
    }

    /// Archive extension (without the dot)
    pub fn extension(&self) -> &str {
        match self {
            LoadedProject::Buffer { extension, .. } | LoadedProject::Files { extension, .. } => {
                extension
            }
        }
    }

    /// Replace the title (e.g. with the one from project metadata)
    pub fn set_title(&mut self, new_title: impl Into<String>) {
        match self {
            LoadedProject::Buffer { title, .. } | LoadedProject::Files { title, .. } => {
                *title = new_title.into();
            }
        }
    }

    /// File list, if this is a multi-file result
    pub fn files(&self) -> Option<&[ProjectFile]> {
        match self {
            LoadedProject::Files { files, .. } => Some(files),
            LoadedProject::Buffer { .. } => None,
        }
    }
}

/// A finished, distributable project file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectArchive {
    /// Project title
    pub title: String,
    /// Archive extension (without the dot)
    pub extension: String,
    /// Archive bytes
    pub data: Vec<u8>,
}

impl ProjectArchive {
    /// File name for this archive (`{title}.{extension}`)
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.title, self.extension)
    }
}

/// Archive assembly progress update
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchiveProgress {
    /// Fraction complete (0.0 to 1.0), monotonic
    pub percent: f32,
    /// File currently being compressed (None once finished)
    pub current_file: Option<String>,
}

/// Event emitted during a project load
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A loader has started
    LoadStarted {
        /// Project ID
        id: ProjectId,
        /// Loader variant, if known
        format: Option<ProjectFormat>,
    },

    /// The format detector classified a manifest
    Detected {
        /// Project ID
        id: ProjectId,
        /// What was observed
        tag: FormatTag,
    },

    /// A unit of fetch work (manifest or asset) has started
    TaskStarted {
        /// Project ID
        id: ProjectId,
        /// URL being fetched
        url: String,
        /// Outstanding tasks for this load, including this one
        outstanding: usize,
    },

    /// A unit of fetch work has settled (successfully or not)
    TaskFinished {
        /// Project ID
        id: ProjectId,
        /// URL that was fetched
        url: String,
        /// Whether the fetch succeeded
        success: bool,
        /// Outstanding tasks for this load after this one
        outstanding: usize,
    },

    /// A loader has finished successfully
    Loaded {
        /// Project ID
        id: ProjectId,
        /// Number of files in the result (1 for buffers)
        files: usize,
    },

    /// Archive assembly progress
    Archiving {
        /// Project ID
        id: ProjectId,
        /// Progress update
        progress: ArchiveProgress,
    },

    /// A project was written to disk
    ProjectSaved {
        /// Project ID
        id: ProjectId,
        /// Final path
        path: PathBuf,
    },

    /// A project failed at some stage
    ProjectFailed {
        /// Project ID
        id: ProjectId,
        /// Stage where failure occurred
        stage: String,
        /// Error message
        error: String,
    },
}
