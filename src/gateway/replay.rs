//! Replay source for recorded gateway events.
//!
//! Reads newline-delimited JSON, one [`GatewayEvent`] per line. Blank lines
//! are skipped; lines that fail to parse are logged and skipped so that one
//! bad record never aborts the rest of the stream.

use super::{EventHandler, EventSource, GatewayEvent};
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

/// Where recorded events are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayInput {
    /// Newline-delimited JSON file
    File(PathBuf),
    /// Standard input
    Stdin,
}

/// Event source replaying newline-delimited JSON events.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    input: ReplayInput,
}

impl ReplaySource {
    /// Create a replay source for the given input.
    pub fn new(input: ReplayInput) -> Self {
        Self { input }
    }

    /// Input this source reads from.
    pub fn input(&self) -> &ReplayInput {
        &self.input
    }

    async fn drive<R>(reader: R, handler: &mut (dyn EventHandler + Send)) -> Result<usize>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut lines = reader.lines();
        let mut line_number = 0usize;
        let mut delivered = 0usize;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| MonitorError::Gateway(format!("Failed to read event stream: {}", e)))?
        {
            line_number += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let event: GatewayEvent = match serde_json::from_str(trimmed) {
                Ok(event) => event,
                Err(e) => {
                    warn!(line = line_number, error = %e, "Skipping malformed event");
                    continue;
                }
            };

            debug!(line = line_number, kind = event.kind_name(), "Delivering event");
            if let Err(e) = handler.handle(event).await {
                error!(line = line_number, error = %e, "Event handler failed");
            }
            delivered += 1;
        }

        Ok(delivered)
    }
}

#[async_trait]
impl EventSource for ReplaySource {
    async fn run(&mut self, handler: &mut (dyn EventHandler + Send)) -> Result<usize> {
        let delivered = match &self.input {
            ReplayInput::File(path) => {
                info!(path = %path.display(), "Replaying events from file");
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    MonitorError::Gateway(format!(
                        "Failed to open event file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::drive(BufReader::new(file), handler).await?
            }
            ReplayInput::Stdin => {
                info!("Replaying events from stdin");
                Self::drive(BufReader::new(tokio::io::stdin()), handler).await?
            }
        };

        info!(delivered, "Event stream ended");
        Ok(delivered)
    }
}
