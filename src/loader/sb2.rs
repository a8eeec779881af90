//! Scratch 2.0 loader
//!
//! The legacy endpoint answers either with a JSON manifest (most projects) or
//! with the `.sb2` zip the author uploaded. JSON manifests reference assets by
//! md5; the offline format numbers them per family instead, so every asset gets
//! a fresh sequential ID and the manifest is rewritten to match.

use super::LoadContext;
use crate::assets::{
    self, AssetReference, LegacyIdAccumulator, RawRef, ResolvedId, has_legacy_hash, legacy_key,
};
use crate::config::LegacyIdOrder;
use crate::error::{Error, Result};
use crate::format::{self, Body, SB_MAGIC, ZIP_MAGIC};
use crate::sort::sort_files;
use crate::types::{LoadedProject, ProjectFile, ProjectFormat, ProjectId};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tracing::{debug, info};

/// Load a Scratch 2.0 project
pub async fn load(ctx: &LoadContext, id: ProjectId) -> Result<LoadedProject> {
    ctx.progress().load_started(Some(ProjectFormat::Sb2));
    let url = ctx.endpoints().legacy_project(id);
    let body = ctx.fetch(&url).await?;
    from_body(ctx, id, body).await
}

/// Load from an already fetched manifest body (JSON or zip)
pub async fn from_body(ctx: &LoadContext, id: ProjectId, body: Vec<u8>) -> Result<LoadedProject> {
    match format::parse_body(body) {
        Body::Json(manifest) => from_manifest(ctx, id, manifest).await,
        Body::Binary(bytes) => from_binary(id, bytes),
    }
}

/// Validate a binary body as an uploaded `.sb2` archive
pub fn from_binary(id: ProjectId, bytes: Vec<u8>) -> Result<LoadedProject> {
    if !format::check_magic(&bytes, ZIP_MAGIC) {
        let probable = format::check_magic(&bytes, SB_MAGIC).then_some(ProjectFormat::Sb);
        return Err(Error::format_mismatch(
            "File is not a valid .sb2 (failed magic check)",
            probable,
        ));
    }

    debug!(project_id = %id, bytes = bytes.len(), "Loaded binary Scratch 2.0 project");

    Ok(LoadedProject::Buffer {
        title: id.to_string(),
        extension: ProjectFormat::Sb2.extension().to_string(),
        data: bytes,
    })
}

/// Fetch the assets of a JSON manifest and build the file list
pub async fn from_manifest(
    ctx: &LoadContext,
    id: ProjectId,
    manifest: Value,
) -> Result<LoadedProject> {
    if !format::is_mid_manifest(&manifest) {
        let probable = format::is_current_manifest(&manifest).then_some(ProjectFormat::Sb3);
        return Err(Error::format_mismatch(
            "Not a Scratch 2 project (missing objName)",
            probable,
        ));
    }

    let mentions = collect_references(&manifest);
    let assets = assets::dedupe(
        mentions
            .iter()
            .map(|(pointer, value)| RawRef::new(pointer, value)),
        legacy_key,
    );
    assets::validate_families(&assets)?;

    info!(
        project_id = %id,
        mentions = mentions.len(),
        assets = assets.len(),
        "Fetching Scratch 2.0 assets"
    );

    let order = ctx.config().fetch.legacy_id_order;
    let (mut files, assigned) = fetch_assets(ctx, &assets, order).await?;

    let resolved: Vec<ResolvedId<'_>> = assigned
        .iter()
        .filter_map(|(index, id)| {
            assets.get(*index).map(|asset| ResolvedId {
                references: &asset.references,
                id: *id,
            })
        })
        .collect();
    let rewritten = assets::rewrite_legacy_ids(&manifest, &resolved);

    // serialized last so it reflects the rewritten IDs
    files.push(ProjectFile::new("project.json", serde_json::to_vec(&rewritten)?));
    sort_files(&mut files);

    Ok(LoadedProject::Files {
        title: id.to_string(),
        extension: ProjectFormat::Sb2.extension().to_string(),
        files,
    })
}

/// Fetch every asset once and number it
///
/// Returns the asset files and `(asset index, assigned ID)` pairs. With
/// [`LegacyIdOrder::Resolved`] IDs are claimed as fetches complete, inside this
/// single task; with [`LegacyIdOrder::Referenced`] they are claimed up front in
/// reference order.
async fn fetch_assets(
    ctx: &LoadContext,
    assets: &[AssetReference],
    order: LegacyIdOrder,
) -> Result<(Vec<ProjectFile>, Vec<(usize, u32)>)> {
    let mut ids = LegacyIdAccumulator::new();
    let preassigned = match order {
        LegacyIdOrder::Referenced => Some(
            assets
                .iter()
                .map(|asset| ids.claim(asset))
                .collect::<Result<Vec<u32>>>()?,
        ),
        LegacyIdOrder::Resolved => None,
    };

    let mut pending: FuturesUnordered<_> = assets
        .iter()
        .enumerate()
        .map(|(index, asset)| async move {
            let url = ctx.endpoints().legacy_asset(&asset.key);
            let data = ctx.fetch_asset(&asset.key, &url).await?;
            Ok::<_, Error>((index, data))
        })
        .collect();

    let mut files = Vec::with_capacity(assets.len() + 1);
    let mut assigned = Vec::with_capacity(assets.len());

    while let Some(result) = pending.next().await {
        let (index, data) = result?;
        let Some(asset) = assets.get(index) else {
            continue;
        };
        let id = match preassigned.as_ref().and_then(|ids| ids.get(index)) {
            Some(id) => *id,
            None => ids.claim(asset)?,
        };
        files.push(ProjectFile::new(format!("{id}.{}", asset.extension), data));
        assigned.push((index, id));
    }

    Ok((files, assigned))
}

/// Every asset mention of a Scratch 2.0 manifest, as (JSON Pointer, object)
///
/// Order: costumes of the stage then of each sprite, then sounds in the same
/// target order, then the stage itself for its pen layer. Children that are
/// list monitors (`listName`) or watchers (`target`) are not sprites and are
/// skipped.
pub fn collect_references(manifest: &Value) -> Vec<(String, &Value)> {
    let mut targets: Vec<(String, &Value)> = vec![(String::new(), manifest)];
    if let Some(children) = manifest.get("children").and_then(Value::as_array) {
        targets.extend(
            children
                .iter()
                .enumerate()
                .filter(|(_, child)| is_sprite(child))
                .map(|(i, child)| (format!("/children/{i}"), child)),
        );
    }

    let mut mentions = Vec::new();
    for field in ["costumes", "sounds"] {
        for &(ref pointer, target) in &targets {
            let Some(entries) = target.get(field).and_then(Value::as_array) else {
                continue;
            };
            mentions.extend(
                entries
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| (format!("{pointer}/{field}/{i}"), entry)),
            );
        }
    }

    if has_legacy_hash(manifest) {
        mentions.push((String::new(), manifest));
    }

    mentions
}

fn is_sprite(child: &Value) -> bool {
    !is_truthy(child.get("listName")) && !is_truthy(child.get("target"))
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
