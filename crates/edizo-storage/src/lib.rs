//! HTTP fetch with retry/backoff and durable snapshot storage for the
//! Edizo catalog.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info_span;

pub const CRATE_NAME: &str = "edizo-storage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

/// Exponential backoff: 1 s, 2 s, 4 s… capped. Two retries after the first
/// attempt by default, matching how the catalog tolerates a flaky sheets API
/// without stalling a listing render for long.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub backoff: BackoffPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: None,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed after retries: {0}")]
    Request(#[from] reqwest::Error),
    /// Non-2xx terminal response. The body is preserved so callers can pull
    /// a remote error message out of it.
    #[error("http status {status} for {url}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },
}

/// Thin retrying GET client over one upstream API.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    backoff: BackoffPolicy,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        Ok(Self {
            client: builder.build().context("building reqwest client")?,
            backoff: config.backoff,
        })
    }

    /// GETs `url`, retrying timeouts, connect failures, 429s and 5xx with
    /// exponential backoff before surfacing the last error.
    pub async fn fetch_bytes(
        &self,
        resource: &str,
        url: &str,
    ) -> Result<FetchedResponse, FetchError> {
        let span = info_span!("http_fetch", resource, url);
        let _guard = span.enter();

        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let final_url = resp.url().to_string();
                    if status.is_success() {
                        let body = resp.bytes().await?.to_vec();
                        return Ok(FetchedResponse {
                            status,
                            final_url,
                            body,
                        });
                    }
                    if classify_status(status) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    let body = resp.text().await.unwrap_or_default();
                    return Err(FetchError::HttpStatus {
                        status: status.as_u16(),
                        url: final_url,
                        body,
                    });
                }
                Err(err) => {
                    if classify_reqwest_error(&err) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        tracing::warn!(
                            resource,
                            attempt,
                            error = %err,
                            "transient fetch failure; backing off"
                        );
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::Request(err));
                }
            }
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub content_hash: String,
    pub path: PathBuf,
    pub byte_size: usize,
    /// True when the on-disk snapshot already held identical content and no
    /// write was performed.
    pub unchanged: bool,
}

/// One JSON snapshot file per resource, replaced atomically via a temp-file
/// rename so readers never observe a torn write.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self, resource: &str) -> PathBuf {
        self.root.join(format!("{resource}.json"))
    }

    pub async fn persist(&self, resource: &str, bytes: &[u8]) -> anyhow::Result<StoredSnapshot> {
        let content_hash = sha256_hex(bytes);
        let path = self.snapshot_path(resource);

        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating snapshot directory {}", self.root.display()))?;

        if let Ok(existing) = fs::read(&path).await {
            if sha256_hex(&existing) == content_hash {
                return Ok(StoredSnapshot {
                    content_hash,
                    path,
                    byte_size: bytes.len(),
                    unchanged: true,
                });
            }
        }

        let temp_path = self.root.join(format!(".{resource}.{}.tmp", std::process::id()));
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp snapshot {}", temp_path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("writing temp snapshot {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp snapshot {}", temp_path.display()))?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err).with_context(|| {
                format!(
                    "renaming temp snapshot {} -> {}",
                    temp_path.display(),
                    path.display()
                )
            });
        }

        Ok(StoredSnapshot {
            content_hash,
            path,
            byte_size: bytes.len(),
            unchanged: false,
        })
    }

    pub async fn load(&self, resource: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.snapshot_path(resource);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("reading snapshot {}", path.display()))
            }
        }
    }
}
