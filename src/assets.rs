//! Asset reference extraction, deduplication and legacy ID assignment
//!
//! Manifests mention the same asset many times (a costume shared by clones, a
//! sound reused across sprites). [`dedupe`] collapses those mentions into one
//! [`AssetReference`] per content key, keeping a JSON Pointer back to every
//! object that mentioned it.
//!
//! Scratch 2.0 archives address assets by small per-family sequence numbers
//! instead of hashes. [`LegacyIdAccumulator`] hands those out and
//! [`rewrite_legacy_ids`] writes them back into a copy of the manifest.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Legacy manifest fields that may hold an asset's content hash, in priority order
pub const LEGACY_HASH_FIELDS: [&str; 3] = ["md5", "baseLayerMD5", "penLayerMD5"];

/// Legacy manifest fields holding a sequential asset ID
pub const LEGACY_ID_FIELDS: [&str; 3] = ["baseLayerID", "soundID", "penLayerID"];

/// One mention of an asset inside a manifest
#[derive(Clone, Copy, Debug)]
pub struct RawRef<'a> {
    /// JSON Pointer to the mentioning object (`""` is the manifest root)
    pub pointer: &'a str,
    /// The mentioning object
    pub value: &'a Value,
}

impl<'a> RawRef<'a> {
    /// Create a raw reference
    pub fn new(pointer: &'a str, value: &'a Value) -> Self {
        Self { pointer, value }
    }
}

/// A unique asset plus every place that mentions it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetReference {
    /// Content key, e.g. `"83a9787d4cb6f3b7632b4ddfebf74367.wav"`
    pub key: String,
    /// Suffix after the last `.` of the key (the whole key if it has none)
    pub extension: String,
    /// JSON Pointers to every mentioning object, in encounter order
    pub references: Vec<String>,
}

impl AssetReference {
    fn new(key: String) -> Self {
        let extension = key
            .rsplit_once('.')
            .map_or(key.as_str(), |(_, ext)| ext)
            .to_string();
        Self {
            key,
            extension,
            references: Vec::new(),
        }
    }

    /// Content hash part of the key (before the first `.`)
    pub fn hash(&self) -> &str {
        self.key.split('.').next().unwrap_or(&self.key)
    }
}

/// Group raw references by key
///
/// The output has one entry per distinct key, ordered by first occurrence,
/// each carrying the pointers of all its mentions.
pub fn dedupe<'a, I, F>(raw_refs: I, key_of: F) -> Vec<AssetReference>
where
    I: IntoIterator<Item = RawRef<'a>>,
    F: Fn(&Value) -> String,
{
    let mut assets: Vec<AssetReference> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for raw in raw_refs {
        let key = key_of(raw.value);
        let index = match index_by_key.get(&key) {
            Some(&index) => index,
            None => {
                assets.push(AssetReference::new(key.clone()));
                index_by_key.insert(key, assets.len() - 1);
                assets.len() - 1
            }
        };
        if let Some(asset) = assets.get_mut(index) {
            asset.references.push(raw.pointer.to_string());
        }
    }

    assets
}

/// Key of a Scratch 2.0 asset mention
///
/// The first non-empty hash field wins; a mention with none is keyed by its
/// string form.
pub fn legacy_key(value: &Value) -> String {
    LEGACY_HASH_FIELDS
        .iter()
        .find_map(|field| non_empty_str(value, field))
        .map(str::to_string)
        .unwrap_or_else(|| string_form(value))
}

/// Whether a legacy object carries any content hash field
pub fn has_legacy_hash(value: &Value) -> bool {
    LEGACY_HASH_FIELDS
        .iter()
        .any(|field| non_empty_str(value, field).is_some())
}

/// Key of a Scratch 3.0 asset mention (also its file name)
///
/// `md5ext` when present, else `assetId.dataFormat`, else the string form.
pub fn content_key(value: &Value) -> String {
    if let Some(md5ext) = non_empty_str(value, "md5ext") {
        return md5ext.to_string();
    }
    match (
        non_empty_str(value, "assetId"),
        non_empty_str(value, "dataFormat"),
    ) {
        (Some(asset_id), Some(data_format)) => format!("{asset_id}.{data_format}"),
        _ => string_form(value),
    }
}

fn non_empty_str<'v>(value: &'v Value, field: &str) -> Option<&'v str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Legacy ID family of an asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetFamily {
    /// Costumes, backdrops and the pen layer
    Image,
    /// Sounds
    Sound,
}

impl AssetFamily {
    /// Extensions numbered by the image counter
    pub const IMAGE_EXTENSIONS: [&'static str; 5] = ["svg", "png", "jpg", "jpeg", "bmp"];

    /// Extensions numbered by the sound counter
    pub const SOUND_EXTENSIONS: [&'static str; 2] = ["wav", "mp3"];

    /// Family of an extension, if it has one
    pub fn of(extension: &str) -> Option<Self> {
        if Self::IMAGE_EXTENSIONS.contains(&extension) {
            Some(AssetFamily::Image)
        } else if Self::SOUND_EXTENSIONS.contains(&extension) {
            Some(AssetFamily::Sound)
        } else {
            None
        }
    }

    /// Family of an asset
    ///
    /// # Errors
    /// [`Error::MalformedAsset`] if the extension belongs to no family
    pub fn of_asset(asset: &AssetReference) -> Result<Self> {
        Self::of(&asset.extension).ok_or_else(|| Error::MalformedAsset {
            key: asset.key.clone(),
            extension: asset.extension.clone(),
        })
    }
}

/// Check every asset has a legacy ID family before anything is fetched
pub fn validate_families(assets: &[AssetReference]) -> Result<()> {
    for asset in assets {
        AssetFamily::of_asset(asset)?;
    }
    Ok(())
}

/// Dense, zero-based sequence numbers per asset family
#[derive(Clone, Debug, Default)]
pub struct LegacyIdAccumulator {
    images: u32,
    sounds: u32,
}

impl LegacyIdAccumulator {
    /// Fresh counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next ID of the asset's family
    ///
    /// # Errors
    /// [`Error::MalformedAsset`] if the extension belongs to no family
    pub fn claim(&mut self, asset: &AssetReference) -> Result<u32> {
        let family = AssetFamily::of_asset(asset)?;
        Ok(self.claim_family(family))
    }

    /// Claim the next ID of `family`
    pub fn claim_family(&mut self, family: AssetFamily) -> u32 {
        let counter = match family {
            AssetFamily::Image => &mut self.images,
            AssetFamily::Sound => &mut self.sounds,
        };
        let id = *counter;
        *counter += 1;
        id
    }

    /// Number of IDs claimed so far in `family`
    pub fn claimed(&self, family: AssetFamily) -> u32 {
        match family {
            AssetFamily::Image => self.images,
            AssetFamily::Sound => self.sounds,
        }
    }
}

/// The ID assigned to one asset, with the places to write it
#[derive(Clone, Copy, Debug)]
pub struct ResolvedId<'a> {
    /// Back-pointers of the asset
    pub references: &'a [String],
    /// Assigned legacy ID
    pub id: u32,
}

/// Produce a copy of `manifest` with every legacy ID field rewritten
///
/// For each back-pointer, whichever of `baseLayerID`, `soundID` and
/// `penLayerID` the object already has is set to the assigned ID. Missing
/// fields are not added; pointers that no longer resolve are skipped.
pub fn rewrite_legacy_ids(manifest: &Value, resolved: &[ResolvedId<'_>]) -> Value {
    let mut rewritten = manifest.clone();
    for assignment in resolved {
        for pointer in assignment.references {
            let Some(Value::Object(object)) = rewritten.pointer_mut(pointer) else {
                continue;
            };
            for field in LEGACY_ID_FIELDS {
                if let Some(slot) = object.get_mut(field) {
                    *slot = Value::from(assignment.id);
                }
            }
        }
    }
    rewritten
}
