use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::{PackSource, ProbeResult};
use crate::core::error::{BundlerError, BundlerResult};

/// Packs served over HTTP(S) below a base URL.
pub struct HttpPackSource {
    client: Client,
    base_url: Url,
}

impl HttpPackSource {
    pub fn new(client: Client, base_url: &str) -> BundlerResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BundlerError::InvalidSource(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BundlerError::InvalidSource(format!(
                "{} cannot hold a path",
                base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Append `path` segment by segment. Each segment is percent-encoded, so
    /// `%`, `#` and `?` stay literal and cannot climb out of the base path.
    fn url(&self, path: &str) -> BundlerResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BundlerError::InvalidSource(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }
}

#[async_trait]
impl PackSource for HttpPackSource {
    async fn probe(&self, path: &str) -> ProbeResult {
        let url = match self.url(path) {
            Ok(url) => url,
            Err(e) => return ProbeResult::TransportError(e.to_string()),
        };
        // Static hosts do not reliably answer HEAD; a GET status is the signal.
        match self.client.get(url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => ProbeResult::Exists,
            Ok(resp) => {
                debug!("Probe {} -> HTTP {}", url, resp.status());
                ProbeResult::Absent
            }
            Err(e) => {
                debug!("Probe {} failed: {}", url, e);
                ProbeResult::TransportError(e.to_string())
            }
        }
    }

    async fn fetch(&self, path: &str) -> BundlerResult<Vec<u8>> {
        let url = self.url(path)?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BundlerError::ResourceMissing {
                location: url.to_string(),
                status: Some(status.as_u16()),
            });
        }

        let bytes = response.bytes().await?;
        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}
