//! Rule matching across the three configured rule sets.
//!
//! Log targets and the notification watchlist are evaluated exhaustively:
//! every matching entry contributes its label and may request
//! auto-download. Authorization stops at the first matching entry since
//! only one decision is needed.

use crate::config::Config;
use crate::error::MonitorError;
use crate::monitor::facts::{EventFacts, EventType};
use crate::monitor::target::{TargetIdentifier, TargetIdentifierConfig};

/// Outcome of evaluating log targets and the watchlist for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Labels of matching log targets, in configuration order
    pub log_labels: Vec<String>,
    /// Labels of matching watchlist entries, in configuration order
    pub watchlist_labels: Vec<String>,
    /// Whether any matching entry requested auto-download
    pub autodownload_requested: bool,
}

impl MatchReport {
    /// Whether no rule matched.
    pub fn is_empty(&self) -> bool {
        self.log_labels.is_empty() && self.watchlist_labels.is_empty()
    }
}

/// Evaluates gateway event facts against the configured rule sets.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    command_prefix: Option<String>,
    authorized_users: Vec<TargetIdentifier>,
    log_targets: Vec<TargetIdentifier>,
    watchlist: Vec<TargetIdentifier>,
}

impl MatchingEngine {
    /// Build an engine from compiled rule sets.
    pub fn new(
        command_prefix: Option<String>,
        authorized_users: Vec<TargetIdentifier>,
        log_targets: Vec<TargetIdentifier>,
        watchlist: Vec<TargetIdentifier>,
    ) -> Self {
        Self {
            command_prefix,
            authorized_users,
            log_targets,
            watchlist,
        }
    }

    /// Compile every rule set declared in a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Regex` if any rule's pattern fails to compile.
    pub fn from_config(config: &Config) -> Result<Self, MonitorError> {
        let authorized = config.authorized_users.as_deref().unwrap_or_default();

        Ok(Self::new(
            config.command_prefix.clone(),
            compile_all(authorized)?,
            compile_all(&config.log_targets)?,
            compile_all(&config.notification_watchlist)?,
        ))
    }

    /// Whether `raw_content` should be treated as a command.
    ///
    /// Without a prefix nothing is a command; an empty prefix makes every
    /// message a command candidate.
    pub fn is_command(&self, raw_content: &str) -> bool {
        self.command_prefix
            .as_deref()
            .is_some_and(|prefix| raw_content.starts_with(prefix))
    }

    /// Find the first authorized-sender rule matching a newly created message.
    ///
    /// Only `New` events are considered.
    pub fn authorize(&self, facts: &EventFacts) -> Option<&TargetIdentifier> {
        if facts.event_type != Some(EventType::New) {
            return None;
        }
        self.authorized_users
            .iter()
            .find(|target| target.matches(facts))
    }

    /// Evaluate log targets and the watchlist against `facts`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatmon::monitor::facts::{EventFacts, EventType};
    /// use chatmon::monitor::matcher::MatchingEngine;
    /// use chatmon::monitor::target::{TargetIdentifier, TargetIdentifierConfig};
    ///
    /// let deletes = TargetIdentifier::new(&TargetIdentifierConfig {
    ///     label: "deletes".to_string(),
    ///     server_id: Some(10),
    ///     event_types: Some(vec![EventType::Delete]),
    ///     ..Default::default()
    /// })
    /// .unwrap();
    /// let engine = MatchingEngine::new(None, vec![], vec![deletes], vec![]);
    ///
    /// let facts = EventFacts {
    ///     server_id: Some(10),
    ///     channel_id: Some(20),
    ///     event_type: Some(EventType::Delete),
    ///     ..Default::default()
    /// };
    /// assert_eq!(engine.evaluate(&facts).log_labels, vec!["deletes"]);
    /// ```
    pub fn evaluate(&self, facts: &EventFacts) -> MatchReport {
        let mut report = MatchReport::default();

        for target in self.log_targets.iter().filter(|t| t.matches(facts)) {
            report.log_labels.push(target.label.clone());
            report.autodownload_requested |= target.wants_autodownload();
        }

        for target in self.watchlist.iter().filter(|t| t.matches(facts)) {
            report.watchlist_labels.push(target.label.clone());
            report.autodownload_requested |= target.wants_autodownload();
        }

        report
    }

    pub fn authorized_users(&self) -> &[TargetIdentifier] {
        &self.authorized_users
    }

    pub fn log_targets(&self) -> &[TargetIdentifier] {
        &self.log_targets
    }

    pub fn watchlist(&self) -> &[TargetIdentifier] {
        &self.watchlist
    }
}

fn compile_all(configs: &[TargetIdentifierConfig]) -> Result<Vec<TargetIdentifier>, MonitorError> {
    configs.iter().map(TargetIdentifier::new).collect()
}
