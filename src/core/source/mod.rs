// ─── Pack Source ───
// Read-only access to the published pack layout:
//
//   packs/{pack}/{folder}/manifest.json
//   packs/{pack}/{folder}/{location}/{name}
//   packs/{pack}/{folder}/{name}            (location == "main")
//
// The layout has no listing capability; callers probe and fetch exact paths.

mod dir;
mod http;
#[cfg(test)]
pub(crate) mod memory;

pub use dir::DirPackSource;
pub use http::HttpPackSource;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::error::{BundlerError, BundlerResult};
use crate::core::selection::PackKey;
use crate::core::version::FolderCandidate;

pub const PACKS_ROOT: &str = "packs";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Result of a single existence check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ProbeResult {
    Exists,
    Absent,
    TransportError(String),
}

impl ProbeResult {
    pub fn exists(&self) -> bool {
        matches!(self, ProbeResult::Exists)
    }
}

#[async_trait]
pub trait PackSource: Send + Sync {
    /// One existence check for `path`. Never retried, never cached.
    async fn probe(&self, path: &str) -> ProbeResult;

    /// Fetch raw bytes. A missing resource is `BundlerError::ResourceMissing`.
    async fn fetch(&self, path: &str) -> BundlerResult<Vec<u8>>;

    /// Human-readable root, for logs.
    fn describe(&self) -> String;
}

/// `packs/{pack}/{folder}/manifest.json`
pub fn manifest_path(pack: &PackKey, folder: &FolderCandidate) -> String {
    format!("{}/{}/{}/{}", PACKS_ROOT, pack, folder, MANIFEST_FILE)
}

/// `packs/{pack}/{folder}/{relative}` where `relative` is already normalized.
pub fn file_path(pack: &PackKey, folder: &FolderCandidate, relative: &str) -> String {
    format!("{}/{}/{}/{}", PACKS_ROOT, pack, folder, relative)
}

/// Where packs are served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Http(String),
    Directory(PathBuf),
}

impl SourceLocation {
    /// `http://` / `https://` roots are remote; anything else is a local directory.
    pub fn parse(raw: &str) -> BundlerResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(BundlerError::InvalidSource("empty source".into()));
        }
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::Http(raw.to_string()))
        } else {
            Ok(Self::Directory(PathBuf::from(raw)))
        }
    }

    pub fn open(&self, client: reqwest::Client) -> BundlerResult<Arc<dyn PackSource>> {
        match self {
            SourceLocation::Http(base) => Ok(Arc::new(HttpPackSource::new(client, base)?)),
            SourceLocation::Directory(root) => {
                if !root.is_dir() {
                    return Err(BundlerError::InvalidSource(format!(
                        "{:?} is not a directory",
                        root
                    )));
                }
                Ok(Arc::new(DirPackSource::new(root.clone())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let pack = PackKey::new("fresh_crops").unwrap();
        let folder = FolderCandidate::new(20, 2);
        assert_eq!(
            manifest_path(&pack, &folder),
            "packs/fresh_crops/20_21/manifest.json"
        );
        assert_eq!(
            file_path(&pack, &folder, "assets/x.png"),
            "packs/fresh_crops/20_21/assets/x.png"
        );
    }

    #[test]
    fn source_location_detects_scheme() {
        assert_eq!(
            SourceLocation::parse("https://example.com/site").unwrap(),
            SourceLocation::Http("https://example.com/site".into())
        );
        assert_eq!(
            SourceLocation::parse("./site").unwrap(),
            SourceLocation::Directory(PathBuf::from("./site"))
        );
        assert!(SourceLocation::parse("  ").is_err());
    }
}
