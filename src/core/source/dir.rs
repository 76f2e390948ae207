use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{PackSource, ProbeResult};
use crate::core::error::{BundlerError, BundlerResult};

/// Packs read from a local checkout of the site (the directory holding `packs/`).
pub struct DirPackSource {
    root: PathBuf,
}

impl DirPackSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

#[async_trait]
impl PackSource for DirPackSource {
    async fn probe(&self, path: &str) -> ProbeResult {
        let full = self.resolve(path);
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => ProbeResult::Exists,
            Ok(_) => ProbeResult::Absent,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProbeResult::Absent,
            Err(e) => {
                debug!("Probe {:?} failed: {}", full, e);
                ProbeResult::TransportError(e.to_string())
            }
        }
    }

    async fn fetch(&self, path: &str) -> BundlerResult<Vec<u8>> {
        let full = self.resolve(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BundlerError::ResourceMissing {
                    location: full.display().to_string(),
                    status: None,
                })
            }
            Err(source) => Err(BundlerError::Io { path: full, source }),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
