//! Scratch 1.x loader
//!
//! The host only serves these projects whole, so the result is the raw file.

use super::LoadContext;
use crate::error::{Error, Result};
use crate::format::{self, SB_MAGIC};
use crate::types::{LoadedProject, ProjectFormat, ProjectId};
use tracing::debug;

/// Load a Scratch 1.x project
pub async fn load(ctx: &LoadContext, id: ProjectId) -> Result<LoadedProject> {
    ctx.progress().load_started(Some(ProjectFormat::Sb));
    let url = ctx.endpoints().legacy_project(id);
    let body = ctx.fetch(&url).await?;
    from_body(id, body)
}

/// Validate an already fetched body as a Scratch 1.x project
pub fn from_body(id: ProjectId, body: Vec<u8>) -> Result<LoadedProject> {
    if !format::check_magic(&body, SB_MAGIC) {
        let probable = format::classify(&body)
            .ok()
            .map(|tag| tag.format())
            .filter(|format| *format != ProjectFormat::Sb);
        return Err(Error::format_mismatch(
            "Project is not a valid .sb file (failed magic check)",
            probable,
        ));
    }

    debug!(project_id = %id, bytes = body.len(), "Loaded Scratch 1.x project");

    Ok(LoadedProject::Buffer {
        title: id.to_string(),
        extension: ProjectFormat::Sb.extension().to_string(),
        data: body,
    })
}
