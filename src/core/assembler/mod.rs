// ─── Archive Assembler ───
// Drives resolver → manifest → file fetches for every selected pack and feeds
// the results into one archive sink.
//
// Packs and files are fetched through ordered buffered streams, and each pack's
// files are written by this task alone in selection order. The sink therefore
// sees exactly the sequence a fully sequential run would produce, including
// which pack wins a path collision.

mod report;

pub use report::{AssemblyReport, FileFailure, PackOutcome, PackReport};

use std::collections::HashSet;
use std::pin::pin;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::archive::{ArchiveEntry, ArchiveSink};
use crate::core::manifest::Manifest;
use crate::core::resolver::{FolderResolver, SourceProber};
use crate::core::selection::{PackKey, SelectionState};
use crate::core::source::{file_path, PackSource};
use crate::core::version::{normalize, NormalizedVersions, VersionSet};

/// Files fetched for one pack, not yet written to the sink.
struct PackContribution {
    report: PackReport,
    files: Vec<ArchiveEntry>,
}

pub struct PackAssembler {
    source: Arc<dyn PackSource>,
    resolver: FolderResolver,
    /// File fetches in flight per pack.
    fetch_concurrency: usize,
    /// Packs processed at once.
    pack_concurrency: usize,
}

impl PackAssembler {
    pub fn new(source: Arc<dyn PackSource>, resolver: FolderResolver) -> Self {
        Self {
            source,
            resolver,
            fetch_concurrency: 8,
            pack_concurrency: 1,
        }
    }

    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.max(1);
        self
    }

    pub fn with_pack_concurrency(mut self, n: usize) -> Self {
        self.pack_concurrency = n.max(1);
        self
    }

    /// Assemble every selected pack into `out`.
    ///
    /// Never fails as a whole: unresolved packs, broken manifests and missing
    /// files are recorded in the report. Callers decide what an empty sink means.
    pub async fn assemble(
        &self,
        selection: &SelectionState,
        out: &mut dyn ArchiveSink,
    ) -> AssemblyReport {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let NormalizedVersions { versions, rejected } = normalize(selection.versions());

        info!(
            "Assembly {}: {} packs, versions {:?}, source {}",
            id,
            selection.packs().len(),
            versions.as_slice(),
            self.source.describe()
        );

        let mut packs = Vec::with_capacity(selection.packs().len());
        {
            let contributions = stream::iter(selection.packs())
                .map(|pack| self.collect_pack(pack, &versions))
                .buffered(self.pack_concurrency);
            let mut contributions = pin!(contributions);

            while let Some(contribution) = contributions.next().await {
                packs.push(Self::write_contribution(contribution, out));
            }
        }

        let report = AssemblyReport {
            id,
            started_at,
            finished_at: Utc::now(),
            versions,
            rejected_versions: rejected,
            packs,
        };
        info!(
            "Assembly {} finished: {}/{} packs assembled, {} files added, {} skipped",
            id,
            report.assembled_packs(),
            report.packs.len(),
            report.files_added(),
            report.files_skipped()
        );
        report
    }

    /// Resolve, load and fetch one pack. Every failure ends up in the report.
    async fn collect_pack(&self, pack: &PackKey, versions: &VersionSet) -> PackContribution {
        let source = self.source.as_ref();
        let prober = SourceProber::new(source);
        let resolution = self.resolver.resolve(&prober, pack, versions).await;

        let mut report = PackReport::new(pack.clone(), resolution.stats);
        let Some(folder) = resolution.folder else {
            warn!(
                "Skipping {}: no folder for versions {:?}",
                pack,
                versions.as_slice()
            );
            return PackContribution {
                report,
                files: Vec::new(),
            };
        };
        report.folder = Some(folder);

        let manifest = match Manifest::load(source, pack, &folder).await {
            Ok(manifest) => manifest,
            Err(error) => {
                warn!("Skipping {} ({}): {}", pack, folder, error);
                report.outcome = PackOutcome::ManifestFailed { error };
                return PackContribution {
                    report,
                    files: Vec::new(),
                };
            }
        };
        report.entries_rejected = manifest.rejected;
        report.files_skipped += manifest.rejected;

        let fetched: Vec<_> = stream::iter(manifest.entries.iter())
            .map(move |entry| async move {
                let relative_path = entry.relative_path();
                let path = file_path(pack, &folder, &relative_path);
                let result = source.fetch(&path).await;
                (entry, relative_path, path, result)
            })
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let mut files = Vec::with_capacity(fetched.len());
        for (entry, relative_path, path, result) in fetched {
            match result {
                Ok(content) => files.push(ArchiveEntry {
                    relative_path,
                    content,
                    merge: entry.merge,
                }),
                Err(e) => {
                    warn!("Skipping file {}: {}", path, e);
                    report.record_failure(path, e.to_string());
                }
            }
        }

        report.outcome = PackOutcome::Assembled;
        PackContribution { report, files }
    }

    fn write_contribution(contribution: PackContribution, out: &mut dyn ArchiveSink) -> PackReport {
        let PackContribution { mut report, files } = contribution;
        let mut written = HashSet::with_capacity(files.len());

        for file in files {
            let path = file.relative_path.clone();
            let merge = file.merge;
            match out.add(file) {
                Ok(replaced) => {
                    report.files_added += 1;
                    if merge {
                        report.merge_files += 1;
                    }
                    if !written.insert(path.clone()) {
                        report.duplicate_entries += 1;
                    } else if replaced {
                        report.collisions += 1;
                    }
                }
                Err(e) => {
                    warn!("Could not add {} to archive: {}", path, e);
                    report.record_failure(path, e.to_string());
                }
            }
        }

        info!(
            "Pack {}: {} files added, {} skipped",
            report.pack, report.files_added, report.files_skipped
        );
        report
    }
}
