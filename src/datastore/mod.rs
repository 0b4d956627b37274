//! Attachment datastore
//!
//! - [`manager`]: datastore path queue, capacity bookkeeping and naming
//! - [`downloader`]: bounded-retry auto-download on top of the manager

pub mod downloader;
pub mod manager;

pub use downloader::{
    AttachmentDownloader, AttachmentFetcher, DownloadFailure, DownloadOutcome, HttpFetcher,
    DOWNLOAD_RETRY_LIMIT, DOWNLOAD_TIMEOUT,
};
pub use manager::{directory_size, DatastoreManager, WriteProbe};
