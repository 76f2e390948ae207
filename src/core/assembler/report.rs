use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::manifest::ManifestLoadError;
use crate::core::resolver::ProbeStats;
use crate::core::selection::PackKey;
use crate::core::version::{FolderCandidate, VersionSet};

/// Per-pack result. Failures stay local to the pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PackOutcome {
    Assembled,
    /// No published folder covers the requested versions.
    Unresolved,
    ManifestFailed { error: ManifestLoadError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackReport {
    pub pack: PackKey,
    pub outcome: PackOutcome,
    pub folder: Option<FolderCandidate>,
    pub probes: ProbeStats,
    pub files_added: usize,
    pub files_skipped: usize,
    pub merge_files: usize,
    /// Paths this pack overwrote from an earlier pack.
    pub collisions: usize,
    /// Paths listed more than once in this pack's own manifest.
    pub duplicate_entries: usize,
    /// Manifest elements dropped during parsing (also counted as skipped).
    pub entries_rejected: usize,
    pub failures: Vec<FileFailure>,
}

impl PackReport {
    pub fn new(pack: PackKey, probes: ProbeStats) -> Self {
        Self {
            pack,
            outcome: PackOutcome::Unresolved,
            folder: None,
            probes,
            files_added: 0,
            files_skipped: 0,
            merge_files: 0,
            collisions: 0,
            duplicate_entries: 0,
            entries_rejected: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, path: String, reason: String) {
        self.files_skipped += 1;
        self.failures.push(FileFailure { path, reason });
    }
}

/// Diagnostics for one assembly request.
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub versions: VersionSet,
    pub rejected_versions: Vec<String>,
    pub packs: Vec<PackReport>,
}

impl AssemblyReport {
    pub fn files_added(&self) -> usize {
        self.packs.iter().map(|p| p.files_added).sum()
    }

    pub fn files_skipped(&self) -> usize {
        self.packs.iter().map(|p| p.files_skipped).sum()
    }

    pub fn assembled_packs(&self) -> usize {
        self.packs
            .iter()
            .filter(|p| p.outcome == PackOutcome::Assembled)
            .count()
    }

    pub fn pack(&self, key: &str) -> Option<&PackReport> {
        self.packs.iter().find(|p| p.pack.as_str() == key)
    }
}
