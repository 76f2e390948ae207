use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the bundler backend.
/// Every module returns `Result<T, BundlerError>`.
///
/// Per-pack and per-file failures never surface through this type during
/// assembly; they are recorded in the `AssemblyReport` instead.
#[derive(Debug, Error)]
pub enum BundlerError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resource missing at {location} (status {status:?})")]
    ResourceMissing {
        location: String,
        status: Option<u16>,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip write error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Archive contains no entries")]
    EmptyArchive,

    // ── Selection / configuration ───────────────────────
    #[error("Invalid pack key: {0:?}")]
    InvalidPackKey(String),

    #[error("Invalid pack source: {0}")]
    InvalidSource(String),

    #[error("Assembly exceeded its deadline of {0}s")]
    DeadlineExceeded(u64),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type BundlerResult<T> = Result<T, BundlerError>;

impl BundlerError {
    /// True when the remote side answered but the resource is not published.
    pub fn is_missing(&self) -> bool {
        matches!(self, BundlerError::ResourceMissing { .. })
    }
}

impl From<std::io::Error> for BundlerError {
    fn from(source: std::io::Error) -> Self {
        BundlerError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// Reports carry failures as strings.
impl serde::Serialize for BundlerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
