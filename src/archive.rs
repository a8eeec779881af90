//! Zip archive assembly
//!
//! Every entry is written with deflate compression, a fixed timestamp and
//! fixed permissions, so the same file list always produces the same bytes.

use crate::error::{Error, Result};
use crate::types::{ArchiveProgress, LoadedProject, ProjectArchive, ProjectFile};
use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644)
}

/// Compress `files` into a zip archive, in the given order
///
/// `on_progress` receives a non-decreasing fraction before each file is
/// compressed and a final `1.0` with no current file.
///
/// # Errors
/// Fails on duplicate paths or if the zip writer fails
pub fn assemble<F>(files: &[ProjectFile], mut on_progress: F) -> Result<Vec<u8>>
where
    F: FnMut(ArchiveProgress),
{
    let mut seen = HashSet::with_capacity(files.len());
    if let Some(duplicate) = files.iter().find(|f| !seen.insert(f.path.as_str())) {
        return Err(Error::Other(format!(
            "duplicate archive path: {}",
            duplicate.path
        )));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let total = files.len();

    for (index, file) in files.iter().enumerate() {
        on_progress(ArchiveProgress {
            percent: index as f32 / total as f32,
            current_file: Some(file.path.clone()),
        });
        writer.start_file(file.path.as_str(), entry_options())?;
        writer.write_all(&file.data)?;
    }

    let data = writer.finish()?.into_inner();
    on_progress(ArchiveProgress {
        percent: 1.0,
        current_file: None,
    });

    debug!(files = total, bytes = data.len(), "Assembled archive");
    Ok(data)
}

/// Read every file of a zip archive, in archive order
pub fn read_archive(bytes: &[u8]) -> Result<Vec<ProjectFile>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut files = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        files.push(ProjectFile::new(entry.name(), data));
    }

    Ok(files)
}

impl LoadedProject {
    /// Turn a load result into its distributable file
    ///
    /// Buffers pass through untouched; file lists are assembled into a zip.
    pub fn into_archive<F>(self, mut on_progress: F) -> Result<ProjectArchive>
    where
        F: FnMut(ArchiveProgress),
    {
        match self {
            LoadedProject::Buffer {
                title,
                extension,
                data,
            } => {
                on_progress(ArchiveProgress {
                    percent: 1.0,
                    current_file: None,
                });
                Ok(ProjectArchive {
                    title,
                    extension,
                    data,
                })
            }
            LoadedProject::Files {
                title,
                extension,
                files,
            } => {
                let data = assemble(&files, on_progress)?;
                Ok(ProjectArchive {
                    title,
                    extension,
                    data,
                })
            }
        }
    }
}
