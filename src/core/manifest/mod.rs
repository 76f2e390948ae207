// ─── Pack Manifest ───
// Fetches and parses `packs/{pack}/{folder}/manifest.json` into normalized
// entries. Normalization happens here so no absolute or traversal-capable path
// can reach the archive.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::error::BundlerError;
use crate::core::selection::PackKey;
use crate::core::source::{manifest_path, PackSource};
use crate::core::version::FolderCandidate;

/// Location value meaning "root of the variant folder".
pub const MAIN_LOCATION: &str = "main";

/// Extensions whose content the consuming game merges instead of replacing.
const MERGE_EXTENSIONS: &[&str] = &["json", "mcmeta"];

/// True when `name` is a merge file (`.json` / `.mcmeta`, any case).
pub fn should_merge(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => MERGE_EXTENSIONS
            .iter()
            .any(|merge_ext| merge_ext.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Why a pack contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManifestLoadError {
    #[error("manifest not found (status {status:?})")]
    NotFound { status: Option<u16> },

    #[error("manifest malformed: {reason}")]
    Malformed { reason: String },

    #[error("manifest unreachable: {reason}")]
    Unreachable { reason: String },
}

/// One manifest element as authored. Every field is optional on the wire.
///
/// `merge` and `version` are advisory and read leniently; a mistyped value
/// keeps the entry.
#[derive(Debug, Deserialize)]
struct RawManifestEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    merge: Option<serde_json::Value>,
    #[serde(default)]
    version: Option<serde_json::Value>,
}

/// Non-negative integer or numeric string; anything else reads as 0.
fn lenient_version(value: &serde_json::Value) -> u32 {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        debug!("Manifest version {} is not a revision number, using 0", value);
        0
    })
}

fn lenient_flag(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        serde_json::Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// A normalized manifest entry.
///
/// `name` never contains a separator; `location` is `"main"` or a relative
/// subfolder without leading or trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub name: String,
    pub location: String,
    pub merge: bool,
    pub version: u32,
}

impl ManifestEntry {
    pub fn new(name: &str, location: &str, version: u32) -> Result<Self, String> {
        let name = normalize_name(name)?;
        let location = normalize_location(location)?;
        Ok(Self {
            merge: should_merge(&name),
            name,
            location,
            version,
        })
    }

    fn from_raw(raw: RawManifestEntry) -> Result<Self, String> {
        let name = raw.name.ok_or_else(|| "missing name".to_string())?;
        let entry = Self::new(
            &name,
            raw.location.as_deref().unwrap_or(MAIN_LOCATION),
            raw.version.as_ref().map(lenient_version).unwrap_or_default(),
        )?;
        if let Some(authored) = raw.merge.as_ref().and_then(lenient_flag) {
            if authored != entry.merge {
                debug!(
                    "Manifest entry {} declares merge={}, using {}",
                    entry.name, authored, entry.merge
                );
            }
        }
        Ok(entry)
    }

    pub fn is_main(&self) -> bool {
        self.location == MAIN_LOCATION
    }

    /// Archive path: `location/name`, or bare `name` for the main location.
    pub fn relative_path(&self) -> String {
        if self.is_main() {
            self.name.clone()
        } else {
            format!("{}/{}", self.location, self.name)
        }
    }
}

fn normalize_name(raw: &str) -> Result<String, String> {
    let name = raw.trim_start_matches('/');
    if name.is_empty() {
        return Err("missing name".into());
    }
    if name.contains('/') || name.contains('\\') {
        return Err(format!("name {:?} contains a path separator", raw));
    }
    if name == "." || name == ".." {
        return Err(format!("name {:?} is not a file", raw));
    }
    Ok(name.to_string())
}

fn normalize_location(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() || trimmed == MAIN_LOCATION {
        return Ok(MAIN_LOCATION.to_string());
    }
    if trimmed.contains('\\') {
        return Err(format!("location {:?} contains a backslash", raw));
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(format!("location {:?} escapes the pack folder", raw));
        }
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

/// Parsed manifest plus the number of elements that had to be dropped.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
    pub rejected: usize,
}

impl Manifest {
    /// Parse manifest bytes. The document must be a JSON array; individual
    /// elements that are unusable are skipped and counted.
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestLoadError> {
        let document: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ManifestLoadError::Malformed {
                reason: e.to_string(),
            })?;

        let items = match document {
            serde_json::Value::Array(items) => items,
            other => {
                return Err(ManifestLoadError::Malformed {
                    reason: format!("expected a JSON array, found {}", json_kind(&other)),
                })
            }
        };

        let mut manifest = Manifest::default();
        for (idx, item) in items.into_iter().enumerate() {
            let entry = serde_json::from_value::<RawManifestEntry>(item)
                .map_err(|e| e.to_string())
                .and_then(ManifestEntry::from_raw);
            match entry {
                Ok(entry) => manifest.entries.push(entry),
                Err(reason) => {
                    warn!("Skipping manifest entry #{}: {}", idx, reason);
                    manifest.rejected += 1;
                }
            }
        }
        Ok(manifest)
    }

    /// Fetch and parse the manifest of `pack` in `folder`.
    pub async fn load(
        source: &dyn PackSource,
        pack: &PackKey,
        folder: &FolderCandidate,
    ) -> Result<Self, ManifestLoadError> {
        let path = manifest_path(pack, folder);

        let bytes = source.fetch(&path).await.map_err(|e| match e {
            BundlerError::ResourceMissing { status, .. } => ManifestLoadError::NotFound { status },
            other => ManifestLoadError::Unreachable {
                reason: other.to_string(),
            },
        })?;

        let manifest = Self::parse(&bytes)?;
        info!(
            "Loaded manifest {} ({} entries, {} rejected)",
            path,
            manifest.entries.len(),
            manifest.rejected
        );
        Ok(manifest)
    }

    pub fn merge_entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| e.merge)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
