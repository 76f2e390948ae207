use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{PackSource, ProbeResult};
use crate::core::error::{BundlerError, BundlerResult};

/// In-memory layout for tests. Records every probe and fetch path.
#[derive(Default)]
pub(crate) struct MemoryPackSource {
    files: HashMap<String, Vec<u8>>,
    broken: HashSet<String>,
    pub probes: Mutex<Vec<String>>,
    pub fetches: Mutex<Vec<String>>,
}

impl MemoryPackSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.to_string(), bytes.into());
        self
    }

    /// Paths that fail as if the connection dropped.
    pub fn with_broken(mut self, path: &str) -> Self {
        self.broken.insert(path.to_string());
        self
    }

    pub fn probe_log(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackSource for MemoryPackSource {
    async fn probe(&self, path: &str) -> ProbeResult {
        self.probes.lock().unwrap().push(path.to_string());
        if self.broken.contains(path) {
            ProbeResult::TransportError("connection reset".into())
        } else if self.files.contains_key(path) {
            ProbeResult::Exists
        } else {
            ProbeResult::Absent
        }
    }

    async fn fetch(&self, path: &str) -> BundlerResult<Vec<u8>> {
        self.fetches.lock().unwrap().push(path.to_string());
        if self.broken.contains(path) {
            return Err(BundlerError::Other(format!("connection reset: {}", path)));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| BundlerError::ResourceMissing {
                location: path.to_string(),
                status: Some(404),
            })
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}
