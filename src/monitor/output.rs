//! Human-readable event records
//!
//! The monitor's program output: match summaries, command notices and the
//! per-message record block. Diagnostics go through `tracing` instead.

use crate::gateway::{Author, ChannelKind, ChannelRef};
use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Prefix of the log target summary line.
pub const LOG_HIT_PREFIX: &str = "(i) Logging for:";

/// Prefix of the watchlist summary line.
pub const WATCHLIST_HIT_PREFIX: &str = "/!\\ WATCHLIST HIT:";

const COMMAND_PREFIX: &str = "***";

/// Destination for program output.
pub trait OutputSink: Send {
    /// Emit one block of text. A trailing newline is added by the sink.
    fn emit(&mut self, text: &str);
}

/// Writes output to stdout, highlighting summary lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str) {
        if text.starts_with(WATCHLIST_HIT_PREFIX) {
            println!("{}", text.red().bold());
        } else if text.starts_with(LOG_HIT_PREFIX) {
            println!("{}", text.cyan());
        } else if text.starts_with(COMMAND_PREFIX) {
            println!("{}", text.yellow());
        } else {
            println!("{}", text);
        }
    }
}

/// Keeps output in memory.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    pub blocks: Vec<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All output joined as it would have been printed.
    pub fn contents(&self) -> String {
        self.blocks.iter().map(|b| format!("{}\n", b)).collect()
    }
}

impl OutputSink for BufferSink {
    fn emit(&mut self, text: &str) {
        self.blocks.push(text.to_string());
    }
}

/// Append-only text file receiving watchlist hits.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    path: PathBuf,
}

impl NotificationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line`, prefixed with `timestamp`.
    pub fn append(&self, timestamp: DateTime<Utc>, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{} {}", format_time(timestamp), line)
    }
}

/// Timestamp format used in records.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Summary line listing matched labels, or `None` if nothing matched.
///
/// # Examples
///
/// ```
/// use chatmon::monitor::output::{match_line, LOG_HIT_PREFIX};
///
/// let labels = vec!["A".to_string(), "B".to_string()];
/// assert_eq!(
///     match_line(LOG_HIT_PREFIX, &labels).as_deref(),
///     Some("(i) Logging for: A B")
/// );
/// assert!(match_line(LOG_HIT_PREFIX, &[]).is_none());
/// ```
pub fn match_line(prefix: &str, labels: &[String]) -> Option<String> {
    if labels.is_empty() {
        None
    } else {
        Some(format!("{} {}", prefix, labels.join(" ")))
    }
}

/// Notice for an authorized command.
pub fn command_line(author: &Author, in_guild: bool, label: &str, raw_content: &str) -> String {
    match author.nickname.as_deref() {
        Some(nickname) if in_guild && nickname != author.name => format!(
            "{} Command ran by user '{}' (nickname: '{}', id: {}) as per identifier '{}':\n\t{}\n",
            COMMAND_PREFIX, author.name, nickname, author.id, label, raw_content
        ),
        _ => format!(
            "{} Command ran by user '{}' (id: {}) as per identifier '{}':\n\t{}\n",
            COMMAND_PREFIX, author.name, author.id, label, raw_content
        ),
    }
}

/// Record header identifying where a message was seen.
///
/// `message_id` is absent for bulk deletions; `author` is absent for any
/// deletion.
pub fn record_header(channel: &ChannelRef, message_id: Option<u64>, author: Option<&str>) -> String {
    let id = message_id.map(|id| format!("{}:", id)).unwrap_or_default();
    let channel_name = channel.name.as_deref().unwrap_or("");
    let author_part = author.map(|a| format!("<{}>", a)).unwrap_or_default();

    match channel.kind {
        ChannelKind::Guild | ChannelKind::Voice => format!(
            "{}({})[{}]{}:",
            id,
            channel.guild_name.as_deref().unwrap_or(""),
            channel_name,
            author_part
        ),
        ChannelKind::Direct => match author {
            Some(_) => format!("{}[DM]{}:", id, author_part),
            None => format!("{}[DM]<{}>:", id, channel_name),
        },
        ChannelKind::Group => format!("{}[GRP: {}]{}:", id, channel_name, author_part),
        ChannelKind::Unknown => format!("{}[?: {}]{}:", id, channel.id, author_part),
    }
}

/// Message record: a header followed by body lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    header: String,
    lines: Vec<String>,
}

impl MessageRecord {
    pub fn new(header: String) -> Self {
        Self {
            header,
            lines: Vec::new(),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Render the record, terminated by a blank line.
    pub fn render(&self) -> String {
        let mut out = self.header.clone();
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        out.push('\n');
        out
    }
}
