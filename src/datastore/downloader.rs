//! Attachment auto-download with bounded retry
//!
//! Each attachment gets at most [`DOWNLOAD_RETRY_LIMIT`] attempts. Every
//! attempt refreshes the datastore first so it observes the capacity spent
//! by earlier downloads. After a failed first attempt the current path is
//! probed for writability and rotated out if it cannot take new files.

use crate::datastore::manager::{DatastoreManager, WriteProbe};
use crate::error::MonitorError;
use crate::gateway::Attachment;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum download attempts per attachment.
pub const DOWNLOAD_RETRY_LIMIT: u32 = 5;

/// Request timeout used by [`HttpFetcher`] in the monitor.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Download primitive: fetch one remote attachment to a local path.
///
/// Implementations have no retry or resume semantics of their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    /// Fetch `attachment` into `destination`. Returns true on success.
    async fn fetch(&self, attachment: &Attachment, destination: &Path) -> bool;
}

/// Why an auto-download gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadFailure {
    /// Every datastore path has been removed
    NoDatastorePaths,
    /// The retry limit was reached
    RetriesExhausted,
    /// The writability probe could not be carried out
    ProbeFailed(String),
}

/// Result of auto-downloading one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Saved to the given path
    Saved(PathBuf),
    /// Gave up
    Failed(DownloadFailure),
}

/// Runs the bounded retry loop for attachment downloads.
#[derive(Debug, Clone)]
pub struct AttachmentDownloader<F> {
    fetcher: F,
    retry_limit: u32,
}

impl<F: AttachmentFetcher> AttachmentDownloader<F> {
    /// Create a downloader with the default retry limit.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            retry_limit: DOWNLOAD_RETRY_LIMIT,
        }
    }

    /// Override the retry limit (minimum 1).
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit.max(1);
        self
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Download `attachment` into the datastore.
    ///
    /// Never returns an error: every failure is reported through
    /// [`DownloadOutcome::Failed`].
    pub async fn download(
        &self,
        datastore: &mut DatastoreManager,
        attachment: &Attachment,
    ) -> DownloadOutcome {
        for attempt in 1..=self.retry_limit {
            if attempt != 1 {
                info!(
                    attachment_id = attachment.id,
                    attempt,
                    limit = self.retry_limit,
                    "Attachment download attempt"
                );
            }

            datastore.refresh();
            if datastore.is_empty() {
                return DownloadOutcome::Failed(DownloadFailure::NoDatastorePaths);
            }

            match datastore.build_destination_path(&attachment.filename) {
                Ok(destination) => {
                    if self.fetcher.fetch(attachment, &destination).await {
                        datastore.spend(attachment.size);
                        debug!(
                            attachment_id = attachment.id,
                            path = %destination.display(),
                            "Attachment downloaded"
                        );
                        return DownloadOutcome::Saved(destination);
                    }
                    warn!(
                        attachment_id = attachment.id,
                        attempt,
                        "Attachment download failed"
                    );
                }
                Err(e) => {
                    warn!(
                        attachment_id = attachment.id,
                        attempt,
                        error = %e,
                        "Failed to prepare download destination"
                    );
                }
            }

            if attempt == 1 {
                let probe = datastore.probe_writable();
                if let Some(outcome) = apply_write_probe(datastore, probe) {
                    return outcome;
                }
            }
        }

        DownloadOutcome::Failed(DownloadFailure::RetriesExhausted)
    }
}

/// Act on the writability check made after a failed first attempt.
///
/// Returns the terminal outcome when the download must stop.
fn apply_write_probe(
    datastore: &mut DatastoreManager,
    probe: WriteProbe,
) -> Option<DownloadOutcome> {
    match probe {
        WriteProbe::Writable => None,
        WriteProbe::Unwritable(e) => {
            warn!(error = %e, "Current datastore path is not writable");
            datastore.rotate(false);
            None
        }
        WriteProbe::Failed(e) => {
            warn!(error = %e, "Datastore write probe failed");
            Some(DownloadOutcome::Failed(DownloadFailure::ProbeFailed(e.to_string())))
        }
    }
}

/// HTTP download primitive.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Http` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn try_fetch(&self, attachment: &Attachment, destination: &Path) -> Result<(), MonitorError> {
        let response = self.client.get(attachment.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Download(format!(
                "HTTP {} for {}",
                status.as_u16(),
                attachment.url
            )));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(destination, &bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl AttachmentFetcher for HttpFetcher {
    async fn fetch(&self, attachment: &Attachment, destination: &Path) -> bool {
        match self.try_fetch(attachment, destination).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    url = %attachment.url,
                    path = %destination.display(),
                    error = %e,
                    "Attachment fetch failed"
                );
                false
            }
        }
    }
}
