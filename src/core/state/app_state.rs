use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::assembler::PackAssembler;
use crate::core::error::{BundlerError, BundlerResult};
use crate::core::http::build_http_client;
use crate::core::resolver::{FolderResolver, DEFAULT_MAX_RUN_LENGTH, DEFAULT_MAX_VERSION};
use crate::core::source::{PackSource, SourceLocation};

const APP_DIR_NAME: &str = "Tinkercraft";
const SETTINGS_FILE: &str = "bundler_settings.json";
pub const DEFAULT_ARCHIVE_NAME: &str = "tinkercraft_packs.zip";

/// Bundler configuration persisted as `bundler_settings.json`.
///
/// Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerSettings {
    /// HTTP(S) base URL or local directory containing `packs/`.
    pub source: Option<String>,
    pub max_version: u32,
    pub max_run_length: u32,
    pub probe_concurrency: usize,
    pub fetch_concurrency: usize,
    pub pack_concurrency: usize,
    pub request_timeout_secs: u64,
    /// Whole-assembly deadline; `None` means unbounded.
    pub deadline_secs: Option<u64>,
    pub archive_name: String,
}

impl Default for BundlerSettings {
    fn default() -> Self {
        Self {
            source: None,
            max_version: DEFAULT_MAX_VERSION,
            max_run_length: DEFAULT_MAX_RUN_LENGTH,
            probe_concurrency: 4,
            fetch_concurrency: 8,
            pack_concurrency: 2,
            request_timeout_secs: 30,
            deadline_secs: None,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

impl BundlerSettings {
    /// Load settings from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> BundlerResult<Self> {
        match path {
            Some(path) => Self::read(path),
            None => {
                let path = default_settings_path();
                if path.exists() {
                    Self::read(&path)
                } else {
                    debug!("No settings at {:?}, using defaults", path);
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> BundlerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| BundlerError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings = serde_json::from_str(&raw)?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn resolver(&self) -> FolderResolver {
        FolderResolver::new(self.max_version, self.max_run_length)
            .with_concurrency(self.probe_concurrency)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Everything one invocation needs: settings plus the shared HTTP client.
pub struct AppState {
    pub settings: BundlerSettings,
    pub http_client: Client,
}

impl AppState {
    pub fn new(settings: BundlerSettings) -> BundlerResult<Self> {
        let http_client =
            build_http_client(Duration::from_secs(settings.request_timeout_secs.max(1)))?;
        Ok(Self {
            settings,
            http_client,
        })
    }

    pub fn open_source(&self) -> BundlerResult<Arc<dyn PackSource>> {
        let raw = self.settings.source.as_deref().ok_or_else(|| {
            BundlerError::InvalidSource("no pack source configured (use --source)".into())
        })?;
        SourceLocation::parse(raw)?.open(self.http_client.clone())
    }

    pub fn assembler(&self) -> BundlerResult<PackAssembler> {
        Ok(PackAssembler::new(self.open_source()?, self.settings.resolver())
            .with_fetch_concurrency(self.settings.fetch_concurrency)
            .with_pack_concurrency(self.settings.pack_concurrency))
    }
}

fn default_base_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_settings_path() -> PathBuf {
    default_base_dir().join(APP_DIR_NAME).join(SETTINGS_FILE)
}
