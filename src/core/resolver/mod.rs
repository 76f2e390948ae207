// ─── Folder Resolver ───
// Picks the smallest published variant folder covering the requested versions.
//
// Without a directory listing the only way to discover variants is to
// enumerate plausible folder names and probe each one. The search is bounded
// by `max_run_length` and `max_version`, so it costs at most
// O(max_run_length × max_version) probes per pack.

use std::pin::pin;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::core::selection::PackKey;
use crate::core::source::{manifest_path, PackSource, ProbeResult};
use crate::core::version::{FolderCandidate, VersionSet};

pub const DEFAULT_MAX_VERSION: u32 = 30;
pub const DEFAULT_MAX_RUN_LENGTH: u32 = 10;

/// Existence check for one candidate folder of one pack.
#[async_trait]
pub trait FolderProber: Send + Sync {
    async fn probe(&self, pack: &PackKey, folder: &FolderCandidate) -> ProbeResult;
}

/// Probes a candidate by checking its `manifest.json` on a [`PackSource`].
pub struct SourceProber<'a> {
    source: &'a dyn PackSource,
}

impl<'a> SourceProber<'a> {
    pub fn new(source: &'a dyn PackSource) -> Self {
        Self { source }
    }
}

#[async_trait]
impl FolderProber for SourceProber<'_> {
    async fn probe(&self, pack: &PackKey, folder: &FolderCandidate) -> ProbeResult {
        self.source.probe(&manifest_path(pack, folder)).await
    }
}

/// Counters for the probes observed during one resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeStats {
    pub probed: usize,
    pub absent: usize,
    pub transport_errors: usize,
}

impl ProbeStats {
    fn record(&mut self, result: &ProbeResult) {
        self.probed += 1;
        match result {
            ProbeResult::Exists => {}
            ProbeResult::Absent => self.absent += 1,
            ProbeResult::TransportError(_) => self.transport_errors += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub folder: Option<FolderCandidate>,
    pub stats: ProbeStats,
}

#[derive(Debug, Clone)]
pub struct FolderResolver {
    /// Exclusive upper bound on run contents: a run ends at most at `max_version - 1`.
    pub max_version: u32,
    pub max_run_length: u32,
    /// Probes in flight at once within one run length. `1` is fully sequential.
    pub probe_concurrency: usize,
}

impl Default for FolderResolver {
    fn default() -> Self {
        Self {
            max_version: DEFAULT_MAX_VERSION,
            max_run_length: DEFAULT_MAX_RUN_LENGTH,
            probe_concurrency: 1,
        }
    }
}

impl FolderResolver {
    pub fn new(max_version: u32, max_run_length: u32) -> Self {
        Self {
            max_version,
            max_run_length,
            ..Self::default()
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.probe_concurrency = n.max(1);
        self
    }

    /// Eligible candidates of run length `len`, ascending by start.
    pub fn candidates(&self, requested: &VersionSet, len: u32) -> Vec<FolderCandidate> {
        let Some(last_start) = self.max_version.checked_sub(len) else {
            return Vec::new();
        };
        (0..=last_start)
            .map(|start| FolderCandidate::new(start, len))
            .filter(|candidate| candidate.is_compatible(requested))
            .collect()
    }

    /// Resolve the folder for `pack`.
    ///
    /// Run lengths are tried from `max(len(requested), 1)` upward; a zero-length
    /// run names the empty folder and is never probed. Within a length, results
    /// are consumed in ascending start order even when probes overlap, so the
    /// winner is always the minimal-length, lowest-start published candidate.
    /// Dropping the stream on a hit cancels probes still in flight.
    pub async fn resolve<P>(&self, prober: &P, pack: &PackKey, requested: &VersionSet) -> Resolution
    where
        P: FolderProber + ?Sized,
    {
        let mut stats = ProbeStats::default();
        let floor = u32::try_from(requested.len()).unwrap_or(u32::MAX).max(1);
        let concurrency = self.probe_concurrency.max(1);

        for len in floor..=self.max_run_length {
            if len > self.max_version {
                break;
            }
            let candidates = self.candidates(requested, len);
            if candidates.is_empty() {
                continue;
            }

            let probes = stream::iter(candidates)
                .map(move |candidate| async move {
                    let result = prober.probe(pack, &candidate).await;
                    (candidate, result)
                })
                .buffered(concurrency);
            let mut probes = pin!(probes);

            while let Some((candidate, result)) = probes.next().await {
                stats.record(&result);
                if let ProbeResult::TransportError(message) = &result {
                    debug!("Probe for {}/{} failed: {}", pack, candidate, message);
                }
                if result.exists() {
                    info!(
                        "Resolved {} to folder {} after {} probes",
                        pack, candidate, stats.probed
                    );
                    return Resolution {
                        folder: Some(candidate),
                        stats,
                    };
                }
            }
        }

        info!(
            "No folder found for {} (versions {:?}, {} probes)",
            pack,
            requested.as_slice(),
            stats.probed
        );
        Resolution {
            folder: None,
            stats,
        }
    }
}
