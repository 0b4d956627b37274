//! Event dispatcher
//!
//! Receives gateway events one at a time, extracts facts, runs the
//! matching engine and emits the resulting output. Attachments of matched
//! messages are auto-downloaded sequentially when a rule requests it.

use crate::config::Config;
use crate::datastore::{
    AttachmentDownloader, AttachmentFetcher, DatastoreManager, DownloadFailure, DownloadOutcome,
};
use crate::error::Result;
use crate::gateway::{ChannelKind, EventHandler, GatewayEvent, MessagePayload};
use crate::monitor::facts::{extract_facts, Extraction};
use crate::monitor::matcher::MatchingEngine;
use crate::monitor::output::{
    command_line, format_time, match_line, record_header, MessageRecord, NotificationLog,
    OutputSink, LOG_HIT_PREFIX, WATCHLIST_HIT_PREFIX,
};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

/// Routes gateway events through matching, download and output.
pub struct EventDispatcher<F, S> {
    engine: MatchingEngine,
    datastore: Option<DatastoreManager>,
    downloader: AttachmentDownloader<F>,
    sink: S,
    notification_log: Option<NotificationLog>,
    autodownload_enabled: bool,
    log_unmatched_events: bool,
}

impl<F: AttachmentFetcher, S: OutputSink> EventDispatcher<F, S> {
    /// Create a dispatcher.
    ///
    /// `datastore` is `None` when no datastore paths are configured, which
    /// disables auto-download.
    pub fn new(
        engine: MatchingEngine,
        datastore: Option<DatastoreManager>,
        downloader: AttachmentDownloader<F>,
        sink: S,
    ) -> Self {
        Self {
            engine,
            datastore,
            downloader,
            sink,
            notification_log: None,
            autodownload_enabled: true,
            log_unmatched_events: true,
        }
    }

    /// Build a dispatcher from a normalized and validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule's regex fails to compile.
    pub fn from_config(config: &Config, fetcher: F, sink: S) -> Result<Self> {
        let engine = MatchingEngine::from_config(config)?;
        let datastore = config
            .attachment_datastore_paths
            .as_ref()
            .map(|paths| DatastoreManager::new(paths.iter().cloned(), config.datastore_budget()));

        let mut dispatcher = Self::new(engine, datastore, AttachmentDownloader::new(fetcher), sink)
            .with_log_unmatched_events(config.log_unmatched_events);
        dispatcher.notification_log = config
            .notification_text_log_location
            .as_ref()
            .map(|path| NotificationLog::new(path.clone()));
        Ok(dispatcher)
    }

    pub fn with_notification_log(mut self, log: NotificationLog) -> Self {
        self.notification_log = Some(log);
        self
    }

    /// Enable or disable auto-download; matching and output are unaffected.
    pub fn with_autodownload(mut self, enabled: bool) -> Self {
        self.autodownload_enabled = enabled;
        self
    }

    /// Whether records are printed for events no rule matched.
    pub fn with_log_unmatched_events(mut self, enabled: bool) -> Self {
        self.log_unmatched_events = enabled;
        self
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn datastore(&self) -> Option<&DatastoreManager> {
        self.datastore.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Process a single event.
    pub async fn dispatch(&mut self, event: &GatewayEvent) -> Result<()> {
        debug!(
            event = event.kind_name(),
            channel_id = event.channel().id,
            "Dispatching event"
        );

        let facts = match extract_facts(event) {
            Extraction::Facts(facts) => facts,
            Extraction::NonMatchable => return Ok(()),
        };

        if let GatewayEvent::MessageCreated { channel, message } = event {
            if self.engine.is_command(message.raw()) {
                if let Some(target) = self.engine.authorize(&facts) {
                    let line = command_line(
                        &message.author,
                        channel.kind == ChannelKind::Guild,
                        &target.label,
                        message.raw(),
                    );
                    self.sink.emit(&line);
                    return Ok(());
                }
                debug!(
                    user_id = message.author.id,
                    "Command from unauthorized sender, treating as a message"
                );
            }
        }

        let report = self.engine.evaluate(&facts);

        if let Some(line) = match_line(LOG_HIT_PREFIX, &report.log_labels) {
            self.sink.emit(&line);
        }

        if let Some(line) = match_line(WATCHLIST_HIT_PREFIX, &report.watchlist_labels) {
            self.sink.emit(&line);
            if let Some(log) = &self.notification_log {
                if let Err(e) = log.append(Utc::now(), &line) {
                    warn!(
                        path = %log.path().display(),
                        error = %e,
                        "Failed to append to notification log"
                    );
                }
            }
        }

        if report.is_empty() && !self.log_unmatched_events {
            return Ok(());
        }

        let record = self.build_record(event, report.autodownload_requested).await?;
        self.sink.emit(&record.render());
        Ok(())
    }

    async fn build_record(
        &mut self,
        event: &GatewayEvent,
        autodownload_requested: bool,
    ) -> Result<MessageRecord> {
        let approximate_now = || format!("Time: {} (approximate)", format_time(Utc::now()));

        let record = match event {
            GatewayEvent::MessageCreated { channel, message }
            | GatewayEvent::MessageUpdated { channel, message } => {
                let author = message.author_display_name();
                let mut record =
                    MessageRecord::new(record_header(channel, Some(message.id), Some(author)));
                self.push_message_body(&mut record, message)?;
                if autodownload_requested && !message.attachments.is_empty() {
                    self.download_attachments(&mut record, message).await;
                }
                record
            }
            GatewayEvent::MessageDeleted {
                channel,
                message_id,
            } => {
                let mut record = MessageRecord::new(record_header(channel, Some(*message_id), None));
                record.push(approximate_now());
                record.push("MESSAGE DELETED");
                record
            }
            GatewayEvent::MessagesBulkDeleted {
                channel,
                message_ids,
            } => {
                let ids: Vec<String> = message_ids.iter().map(u64::to_string).collect();
                let mut record = MessageRecord::new(record_header(channel, None, None));
                record.push(approximate_now());
                record.push(format!("MESSAGES DELETED: {}", ids.join(" ")));
                record
            }
        };

        Ok(record)
    }

    fn push_message_body(&self, record: &mut MessageRecord, message: &MessagePayload) -> Result<()> {
        record.push(format!("Time: {}", format_time(message.display_time())));
        record.push(format!("Message: {}", message.content));

        for (i, embed) in message.embeds.iter().enumerate() {
            record.push(format!("Embed[{}]: {}", i, serde_json::to_string_pretty(embed)?));
        }
        for (i, attachment) in message.attachments.iter().enumerate() {
            record.push(format!(
                "Attachment[{}]: {}",
                i,
                serde_json::to_string_pretty(attachment)?
            ));
        }
        Ok(())
    }

    async fn download_attachments(&mut self, record: &mut MessageRecord, message: &MessagePayload) {
        if !self.autodownload_enabled {
            debug!(message_id = message.id, "Auto-download disabled, skipping attachments");
            return;
        }

        let Some(datastore) = self.datastore.as_mut() else {
            debug!(
                message_id = message.id,
                "No datastore paths configured, skipping attachments"
            );
            return;
        };

        let mut failed = false;
        let mut no_paths = false;
        for attachment in &message.attachments {
            match self.downloader.download(datastore, attachment).await {
                DownloadOutcome::Saved(path) => {
                    record.push(format!("Attachment downloaded to: {}", path.display()));
                }
                DownloadOutcome::Failed(reason) => {
                    warn!(
                        attachment_id = attachment.id,
                        reason = ?reason,
                        "Unable to auto-download attachment"
                    );
                    failed = true;
                    no_paths |= reason == DownloadFailure::NoDatastorePaths;
                }
            }
        }

        if failed {
            let detail = if no_paths {
                ": no valid datastore paths"
            } else {
                ""
            };
            record.push(format!(
                "Unable to auto-download attachment(s){}. See URL(s) for manual download.",
                detail
            ));
        }
    }
}

#[async_trait]
impl<F: AttachmentFetcher, S: OutputSink> EventHandler for EventDispatcher<F, S> {
    async fn handle(&mut self, event: GatewayEvent) -> Result<()> {
        self.dispatch(&event).await
    }
}
