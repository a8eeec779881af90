//! Manifest format detection
//!
//! The host serves three incompatible manifest generations, sometimes from the
//! same endpoint. [`classify`] sniffs a body: JSON bodies are told apart by
//! their fields, anything else by its binary signature.

use crate::error::{Error, Result};
use crate::loader::{self, LoadContext};
use crate::types::{Event, FormatTag, LoadedProject, ProjectFormat, ProjectId};
use serde_json::Value;
use tracing::{debug, info};

/// Signature of a Scratch 1.x project file
pub const SB_MAGIC: &[u8] = b"ScratchV01";

/// Signature of a zip archive (Scratch 2.0 project uploaded as a file)
pub const ZIP_MAGIC: &[u8] = b"PK";

const SIGNATURES: [(&[u8], ProjectFormat); 2] =
    [(SB_MAGIC, ProjectFormat::Sb), (ZIP_MAGIC, ProjectFormat::Sb2)];

/// Whether `bytes` starts with `magic`
pub fn check_magic(bytes: &[u8], magic: &[u8]) -> bool {
    bytes.starts_with(magic)
}

/// A manifest body, decoded as far as possible
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// The body parsed as JSON
    Json(Value),
    /// The body is not JSON
    Binary(Vec<u8>),
}

/// Try to decode a body as JSON, keeping the raw bytes otherwise
pub fn parse_body(bytes: Vec<u8>) -> Body {
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => Body::Json(value),
        Err(_) => Body::Binary(bytes),
    }
}

/// Whether a JSON manifest belongs to the Scratch 2.0 generation
pub fn is_mid_manifest(manifest: &Value) -> bool {
    manifest.get("objName").is_some_and(Value::is_string)
}

/// Whether a JSON manifest belongs to the Scratch 3.0 generation
pub fn is_current_manifest(manifest: &Value) -> bool {
    !is_mid_manifest(manifest) && manifest.get("targets").is_some_and(Value::is_array)
}

/// Classify a raw manifest body
///
/// # Errors
/// [`Error::FormatMismatch`] when neither the JSON structure nor the binary
/// signature is recognized
pub fn classify(bytes: &[u8]) -> Result<FormatTag> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(manifest) => classify_manifest(&manifest),
        Err(_) => classify_binary(bytes),
    }
}

/// Classify a parsed JSON manifest
pub fn classify_manifest(manifest: &Value) -> Result<FormatTag> {
    if is_mid_manifest(manifest) {
        Ok(FormatTag::MidJson)
    } else if is_current_manifest(manifest) {
        Ok(FormatTag::Current)
    } else {
        Err(Error::format_mismatch(
            "Manifest has neither objName nor a targets array",
            None,
        ))
    }
}

/// Classify a body that is not JSON by its signature
///
/// On failure the error suggests the format whose signature shares the longest
/// prefix with the body, if any does.
pub fn classify_binary(bytes: &[u8]) -> Result<FormatTag> {
    if check_magic(bytes, SB_MAGIC) {
        Ok(FormatTag::LegacyBinary)
    } else if check_magic(bytes, ZIP_MAGIC) {
        Ok(FormatTag::MidBinary)
    } else {
        Err(Error::format_mismatch(
            "Unrecognized binary project signature",
            closest_signature(bytes),
        ))
    }
}

/// The format whose signature shares the longest non-empty prefix with `bytes`
pub fn closest_signature(bytes: &[u8]) -> Option<ProjectFormat> {
    SIGNATURES
        .iter()
        .map(|(magic, format)| {
            let shared = magic
                .iter()
                .zip(bytes)
                .take_while(|(expected, actual)| expected == actual)
                .count();
            (shared, *format)
        })
        .filter(|(shared, _)| *shared > 0)
        .max_by_key(|(shared, _)| *shared)
        .map(|(_, format)| format)
}

/// Fetch a project's manifest once and classify it
pub async fn detect(ctx: &LoadContext, id: ProjectId) -> Result<FormatTag> {
    let (tag, _body) = fetch_and_classify(ctx, id).await?;
    Ok(tag)
}

/// Detect the format and load the project with the matching loader
///
/// The body fetched for detection is handed to the loader, so the manifest is
/// requested only once.
pub async fn load_detected(ctx: &LoadContext, id: ProjectId) -> Result<LoadedProject> {
    ctx.progress().load_started(None);
    let (tag, body) = fetch_and_classify(ctx, id).await?;

    info!(project_id = %id, ?tag, "Loading project with detected format");

    match tag {
        FormatTag::LegacyBinary => loader::sb::from_body(id, body),
        FormatTag::MidBinary | FormatTag::MidJson => loader::sb2::from_body(ctx, id, body).await,
        FormatTag::Current => loader::sb3::from_body(ctx, id, body).await,
    }
}

async fn fetch_and_classify(ctx: &LoadContext, id: ProjectId) -> Result<(FormatTag, Vec<u8>)> {
    let url = ctx.endpoints().project(id);
    let body = ctx.fetch(&url).await?;
    let tag = classify(&body)?;

    debug!(project_id = %id, ?tag, bytes = body.len(), "Classified manifest");
    ctx.progress().emit(Event::Detected { id, tag });

    Ok((tag, body))
}
