// ─── Pack Archive ───
// Output sink for assembled files, finalized once into a zip.

use std::collections::HashMap;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::error::{BundlerError, BundlerResult};

/// File written into the output archive.
///
/// `relative_path` is already normalized and never carries the variant folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub relative_path: String,
    pub content: Vec<u8>,
    pub merge: bool,
}

/// Append-only destination for assembled files.
pub trait ArchiveSink {
    /// Add an entry. Returns `true` when an existing entry at the same path was
    /// replaced (last write wins).
    fn add(&mut self, entry: ArchiveEntry) -> BundlerResult<bool>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory archive keeping first-insertion order.
#[derive(Debug, Default)]
pub struct PackArchive {
    entries: Vec<ArchiveEntry>,
    index: HashMap<String, usize>,
}

/// What was written by [`PackArchive::write_to_path`].
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
    pub sha256: String,
}

impl PackArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, relative_path: &str) -> Option<&ArchiveEntry> {
        self.index.get(relative_path).map(|&idx| &self.entries[idx])
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.relative_path.as_str())
    }

    /// Finalize into a zip written to `writer`. Consumes the archive.
    pub fn write_zip<W: Write + Seek>(self, writer: W) -> BundlerResult<W> {
        if self.entries.is_empty() {
            return Err(BundlerError::EmptyArchive);
        }

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(writer);
        for entry in &self.entries {
            zip.start_file(entry.relative_path.as_str(), options)?;
            zip.write_all(&entry.content)?;
        }
        Ok(zip.finish()?)
    }

    /// Finalize into a zip file at `dest`, creating parent directories.
    pub async fn write_to_path(self, dest: &Path) -> BundlerResult<ArchiveSummary> {
        let entries = self.entries.len();
        let bytes = self.write_zip(Cursor::new(Vec::new()))?.into_inner();

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BundlerError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| BundlerError::Io {
                path: dest.to_path_buf(),
                source: e,
            })?;

        let sha256 = hex::encode(Sha256::digest(&bytes));
        info!(
            "Wrote archive {:?}: {} entries, {} bytes, sha256 {}",
            dest,
            entries,
            bytes.len(),
            sha256
        );

        Ok(ArchiveSummary {
            path: dest.to_path_buf(),
            entries,
            bytes: bytes.len() as u64,
            sha256,
        })
    }
}

impl ArchiveSink for PackArchive {
    fn add(&mut self, entry: ArchiveEntry) -> BundlerResult<bool> {
        match self.index.get(&entry.relative_path).copied() {
            Some(idx) => {
                warn!(
                    "Archive path collision at {}, keeping the later file",
                    entry.relative_path
                );
                self.entries[idx] = entry;
                Ok(true)
            }
            None => {
                self.index
                    .insert(entry.relative_path.clone(), self.entries.len());
                self.entries.push(entry);
                Ok(false)
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
