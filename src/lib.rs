//! chatmon - chat platform monitoring agent library
//!
//! Watches message events delivered by a chat gateway, matches them against
//! configured rules, prints human-readable records and auto-downloads
//! attachments of matching messages into size-bounded local directories.
//!
//! # Architecture
//!
//! - `gateway`: typed gateway events and the event source/handler seam
//! - `monitor`: fact extraction, rule matching, output and the dispatcher
//! - `datastore`: datastore path rotation and attachment downloads
//! - `config`: profile loading, normalization and validation
//! - `commands`: CLI command handlers
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use chatmon::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load("profile.yaml")?;
//!     config.normalize();
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod error;
pub mod gateway;
pub mod monitor;

pub use config::Config;
pub use datastore::{AttachmentDownloader, DatastoreManager};
pub use error::{MonitorError, Result};
pub use gateway::GatewayEvent;
pub use monitor::{EventDispatcher, MatchingEngine, TargetIdentifier};
