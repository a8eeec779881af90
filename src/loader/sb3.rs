//! Scratch 3.0 loader
//!
//! Assets are content-addressed: the dedup key doubles as the file name, so no
//! renumbering or manifest rewrite is needed.

use super::LoadContext;
use crate::assets::{self, RawRef, content_key};
use crate::error::{Error, Result};
use crate::format::{self, Body};
use crate::sort::sort_files;
use crate::types::{LoadedProject, ProjectFile, ProjectFormat, ProjectId};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::info;

/// Load a Scratch 3.0 project
pub async fn load(ctx: &LoadContext, id: ProjectId) -> Result<LoadedProject> {
    ctx.progress().load_started(Some(ProjectFormat::Sb3));
    let url = ctx.endpoints().project(id);
    let body = ctx.fetch(&url).await?;
    from_body(ctx, id, body).await
}

/// Load from an already fetched manifest body
pub async fn from_body(ctx: &LoadContext, id: ProjectId, body: Vec<u8>) -> Result<LoadedProject> {
    match format::parse_body(body) {
        Body::Json(manifest) => from_manifest(ctx, id, manifest).await,
        Body::Binary(bytes) => {
            let probable = match format::classify_binary(&bytes) {
                Ok(tag) => Some(tag.format()),
                Err(e) => e.probable_format(),
            };
            Err(Error::format_mismatch(
                "Not a Scratch 3 project (binary body)",
                probable,
            ))
        }
    }
}

/// Fetch the assets of a JSON manifest and build the file list
pub async fn from_manifest(
    ctx: &LoadContext,
    id: ProjectId,
    manifest: Value,
) -> Result<LoadedProject> {
    if format::is_mid_manifest(&manifest) {
        return Err(Error::format_mismatch(
            "Not a Scratch 3 project (found objName)",
            Some(ProjectFormat::Sb2),
        ));
    }
    if !format::is_current_manifest(&manifest) {
        return Err(Error::format_mismatch(
            "Not a Scratch 3 project, missing targets",
            None,
        ));
    }

    let mentions = collect_references(&manifest);
    let assets = assets::dedupe(
        mentions
            .iter()
            .map(|(pointer, value)| RawRef::new(pointer, value)),
        content_key,
    );

    info!(
        project_id = %id,
        mentions = mentions.len(),
        assets = assets.len(),
        "Fetching Scratch 3.0 assets"
    );

    let fetched = try_join_all(assets.iter().map(|asset| async move {
        let url = ctx.endpoints().asset(&asset.key);
        let data = ctx.fetch_asset(&asset.key, &url).await?;
        Ok::<_, Error>(ProjectFile::new(asset.key.clone(), data))
    }))
    .await?;

    let mut files = Vec::with_capacity(fetched.len() + 1);
    files.push(ProjectFile::new("project.json", serde_json::to_vec(&manifest)?));
    files.extend(fetched);
    sort_files(&mut files);

    Ok(LoadedProject::Files {
        title: id.to_string(),
        extension: ProjectFormat::Sb3.extension().to_string(),
        files,
    })
}

/// Every costume then every sound of every target, as (JSON Pointer, object)
pub fn collect_references(manifest: &Value) -> Vec<(String, &Value)> {
    let Some(targets) = manifest.get("targets").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut mentions = Vec::new();
    for field in ["costumes", "sounds"] {
        for (t, target) in targets.iter().enumerate() {
            let Some(entries) = target.get(field).and_then(Value::as_array) else {
                continue;
            };
            mentions.extend(
                entries
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| (format!("/targets/{t}/{field}/{i}"), entry)),
            );
        }
    }
    mentions
}
