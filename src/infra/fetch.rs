use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::ports::FetchPort;

/// Fetch adapter backed by reqwest. Transport failures and non-2xx statuses
/// both translate into `SourceUnavailable`; there is no retry here.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_seconds),
        }
    }
}

#[async_trait]
impl FetchPort for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(locator)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| LoaderError::SourceUnavailable {
                message: format!("GET {locator}: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoaderError::SourceUnavailable {
                message: format!("GET {locator}: HTTP {}", status.as_u16()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoaderError::SourceUnavailable {
                message: format!("reading body of {locator}: {e}"),
            })?;
        debug!(bytes = bytes.len(), "fetched source payload");
        Ok(bytes.to_vec())
    }
}

/// Fetch adapter that reads a local file. Used by the `clean` command and in
/// tests, where the locator is a filesystem path.
#[derive(Default)]
pub struct FileFetcher;

impl FileFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FetchPort for FileFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        let path = PathBuf::from(locator);
        tokio::fs::read(&path)
            .await
            .map_err(|e| LoaderError::SourceUnavailable {
                message: format!("reading {}: {e}", path.display()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_fetcher_reads_local_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        std::fs::write(&path, b"a,b\n1,2\n").unwrap();

        let fetcher = FileFetcher::new();
        let bytes = fetcher.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn file_fetcher_reports_missing_files_as_source_unavailable() {
        let fetcher = FileFetcher::new();
        let err = fetcher.fetch("definitely/not/here.csv").await.err().unwrap();
        assert!(matches!(err, LoaderError::SourceUnavailable { .. }));
    }
}
