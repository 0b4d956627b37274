//! Target identifiers: the configurable rule unit.
//!
//! A target identifier is a conjunction of optional constraints. Any
//! constraint left unset, and any fact the event does not carry, imposes no
//! restriction.

use crate::error::MonitorError;
use crate::monitor::facts::{EventFacts, EventType};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Message processing option, as written in the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingOption {
    /// Strip all whitespace from the content before regex matching
    IgnoreWhitespace,
    /// Require that the message has attachments
    HasAttachments,
    /// Download attachments, if any. Implies `HasAttachments`.
    AutodownloadAttachments,
}

/// Set of [`ProcessingOption`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProcessingOptions(u8);

impl ProcessingOptions {
    pub const IGNORE_WHITESPACE: Self = Self(0b001);
    pub const HAS_ATTACHMENTS: Self = Self(0b010);
    pub const AUTODOWNLOAD_ATTACHMENTS: Self = Self(0b100);

    /// Empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether every option in `other` is present.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of both sets.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Apply implied options: auto-download requires attachments.
    pub const fn with_implied(self) -> Self {
        if self.contains(Self::AUTODOWNLOAD_ATTACHMENTS) {
            self.union(Self::HAS_ATTACHMENTS)
        } else {
            self
        }
    }
}

impl From<ProcessingOption> for ProcessingOptions {
    fn from(option: ProcessingOption) -> Self {
        match option {
            ProcessingOption::IgnoreWhitespace => Self::IGNORE_WHITESPACE,
            ProcessingOption::HasAttachments => Self::HAS_ATTACHMENTS,
            ProcessingOption::AutodownloadAttachments => Self::AUTODOWNLOAD_ATTACHMENTS,
        }
    }
}

impl FromIterator<ProcessingOption> for ProcessingOptions {
    fn from_iter<I: IntoIterator<Item = ProcessingOption>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, option| set.union(option.into()))
    }
}

/// Target identifier as declared in the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetIdentifierConfig {
    /// Label printed when the rule matches
    #[serde(default)]
    pub label: String,

    pub server_id: Option<u64>,

    /// May equal `server_id` for a guild's default channel
    pub channel_id: Option<u64>,

    pub user_id: Option<u64>,

    /// Regex searched for in the stripped message content
    pub message_regex: Option<String>,

    #[serde(default)]
    pub processing_options: Vec<ProcessingOption>,

    /// Event types this rule applies to (absent means all)
    pub event_types: Option<Vec<EventType>>,
}

impl TargetIdentifierConfig {
    /// Insert options implied by others. Returns true if anything was added.
    pub fn normalize_options(&mut self) -> bool {
        if self
            .processing_options
            .contains(&ProcessingOption::AutodownloadAttachments)
            && !self
                .processing_options
                .contains(&ProcessingOption::HasAttachments)
        {
            self.processing_options
                .push(ProcessingOption::HasAttachments);
            return true;
        }
        false
    }
}

/// Compiled target identifier.
#[derive(Debug, Clone)]
pub struct TargetIdentifier {
    pub label: String,
    pub server_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub user_id: Option<u64>,
    pub message_regex: Option<Regex>,
    pub processing_options: ProcessingOptions,
    pub event_types: Option<Vec<EventType>>,
}

impl TargetIdentifier {
    /// Compile a declared target identifier.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Regex` if `message_regex` does not compile.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatmon::monitor::target::{TargetIdentifier, TargetIdentifierConfig};
    ///
    /// let config = TargetIdentifierConfig {
    ///     label: "bad".to_string(),
    ///     message_regex: Some("[unclosed".to_string()),
    ///     ..Default::default()
    /// };
    /// assert!(TargetIdentifier::new(&config).is_err());
    /// ```
    pub fn new(config: &TargetIdentifierConfig) -> Result<Self, MonitorError> {
        let message_regex = config
            .message_regex
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        Ok(Self {
            label: config.label.clone(),
            server_id: config.server_id,
            channel_id: config.channel_id,
            user_id: config.user_id,
            message_regex,
            processing_options: config
                .processing_options
                .iter()
                .copied()
                .collect::<ProcessingOptions>()
                .with_implied(),
            event_types: config.event_types.clone(),
        })
    }

    /// Whether auto-download is requested by this rule.
    pub fn wants_autodownload(&self) -> bool {
        self.processing_options
            .contains(ProcessingOptions::AUTODOWNLOAD_ATTACHMENTS)
    }

    /// Check whether every configured constraint is satisfied by `facts`.
    ///
    /// A constraint is only checked when both the rule field and the
    /// corresponding fact are present.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatmon::monitor::facts::EventFacts;
    /// use chatmon::monitor::target::{TargetIdentifier, TargetIdentifierConfig};
    ///
    /// let rule = TargetIdentifier::new(&TargetIdentifierConfig {
    ///     label: "foo".to_string(),
    ///     message_regex: Some("foo".to_string()),
    ///     ..Default::default()
    /// })
    /// .unwrap();
    ///
    /// let facts = EventFacts {
    ///     message_content: Some("xfoox".to_string()),
    ///     ..Default::default()
    /// };
    /// assert!(rule.matches(&facts));
    /// ```
    pub fn matches(&self, facts: &EventFacts) -> bool {
        if !scope_matches(self.server_id, facts.server_id)
            || !scope_matches(self.channel_id, facts.channel_id)
            || !scope_matches(self.user_id, facts.user_id)
        {
            return false;
        }

        if let (Some(regex), Some(content)) = (&self.message_regex, &facts.message_content) {
            let found = if self
                .processing_options
                .contains(ProcessingOptions::IGNORE_WHITESPACE)
            {
                let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
                regex.is_match(&compact)
            } else {
                regex.is_match(content)
            };
            if !found {
                return false;
            }
        }

        if self
            .processing_options
            .contains(ProcessingOptions::HAS_ATTACHMENTS)
            && facts.has_attachment == Some(false)
        {
            return false;
        }

        if let (Some(types), Some(event_type)) = (&self.event_types, facts.event_type) {
            if !types.contains(&event_type) {
                return false;
            }
        }

        true
    }

    /// Human-readable summary of active constraints.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if let Some(server) = self.server_id {
            parts.push(format!("server={}", server));
        }
        if let Some(channel) = self.channel_id {
            parts.push(format!("channel={}", channel));
        }
        if let Some(user) = self.user_id {
            parts.push(format!("user={}", user));
        }
        if let Some(regex) = &self.message_regex {
            parts.push(format!("message~{}", regex.as_str()));
        }
        if let Some(types) = &self.event_types {
            let names: Vec<String> = types.iter().map(|t| t.to_string()).collect();
            parts.push(format!("events={}", names.join(",")));
        }
        if self
            .processing_options
            .contains(ProcessingOptions::IGNORE_WHITESPACE)
        {
            parts.push("ignore_whitespace".to_string());
        }
        if self.wants_autodownload() {
            parts.push("autodownload".to_string());
        } else if self
            .processing_options
            .contains(ProcessingOptions::HAS_ATTACHMENTS)
        {
            parts.push("has_attachments".to_string());
        }

        if parts.is_empty() {
            "no constraints (all events)".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn scope_matches(rule: Option<u64>, fact: Option<u64>) -> bool {
    match (rule, fact) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(config: TargetIdentifierConfig) -> TargetIdentifier {
        TargetIdentifier::new(&config).unwrap()
    }

    fn full_facts() -> EventFacts {
        EventFacts {
            server_id: Some(1),
            channel_id: Some(2),
            user_id: Some(3),
            message_content: Some("hello world".to_string()),
            has_attachment: Some(true),
            event_type: Some(EventType::New),
        }
    }

    #[test]
    fn test_unconstrained_rule_matches_everything() {
        let any = rule(TargetIdentifierConfig::default());
        assert!(any.matches(&EventFacts::default()));
        assert!(any.matches(&full_facts()));
    }

    #[test]
    fn test_user_id_mismatch_and_absent_fact() {
        let by_user = rule(TargetIdentifierConfig {
            user_id: Some(42),
            ..Default::default()
        });

        let mut facts = full_facts();
        assert!(!by_user.matches(&facts));

        facts.user_id = Some(42);
        assert!(by_user.matches(&facts));

        facts.user_id = None;
        assert!(by_user.matches(&facts));
    }

    #[test]
    fn test_server_and_channel_equality() {
        let scoped = rule(TargetIdentifierConfig {
            server_id: Some(1),
            channel_id: Some(9),
            ..Default::default()
        });
        assert!(!scoped.matches(&full_facts()));

        let mut facts = full_facts();
        facts.channel_id = Some(9);
        assert!(scoped.matches(&facts));
    }

    #[test]
    fn test_regex_is_search_not_full_match() {
        let foo = rule(TargetIdentifierConfig {
            message_regex: Some("foo".to_string()),
            ..Default::default()
        });
        let mut facts = EventFacts {
            message_content: Some("xfoox".to_string()),
            ..Default::default()
        };
        assert!(foo.matches(&facts));

        facts.message_content = Some("bar".to_string());
        assert!(!foo.matches(&facts));

        facts.message_content = None;
        assert!(foo.matches(&facts));
    }

    #[test]
    fn test_ignore_whitespace_normalizes_before_matching() {
        let strict = rule(TargetIdentifierConfig {
            message_regex: Some("ab".to_string()),
            ..Default::default()
        });
        let lenient = rule(TargetIdentifierConfig {
            message_regex: Some("ab".to_string()),
            processing_options: vec![ProcessingOption::IgnoreWhitespace],
            ..Default::default()
        });
        let facts = EventFacts {
            message_content: Some("a \t b".to_string()),
            ..Default::default()
        };

        assert!(lenient.matches(&facts));
        assert!(!strict.matches(&facts));
        assert_eq!(facts.message_content.as_deref(), Some("a \t b"));
    }

    #[test]
    fn test_has_attachments_only_disproved_by_explicit_false() {
        let needs_files = rule(TargetIdentifierConfig {
            processing_options: vec![ProcessingOption::HasAttachments],
            ..Default::default()
        });
        let mut facts = EventFacts::default();
        assert!(needs_files.matches(&facts));

        facts.has_attachment = Some(false);
        assert!(!needs_files.matches(&facts));

        facts.has_attachment = Some(true);
        assert!(needs_files.matches(&facts));
    }

    #[test]
    fn test_event_type_membership() {
        let deletes = rule(TargetIdentifierConfig {
            event_types: Some(vec![EventType::Delete]),
            ..Default::default()
        });
        let mut facts = full_facts();
        assert!(!deletes.matches(&facts));

        facts.event_type = Some(EventType::Delete);
        assert!(deletes.matches(&facts));

        facts.event_type = None;
        assert!(deletes.matches(&facts));
    }

    #[test]
    fn test_processing_options_set_semantics() {
        let set: ProcessingOptions = vec![
            ProcessingOption::IgnoreWhitespace,
            ProcessingOption::AutodownloadAttachments,
        ]
        .into_iter()
        .collect();

        assert!(set.contains(ProcessingOptions::IGNORE_WHITESPACE));
        assert!(!set.contains(ProcessingOptions::HAS_ATTACHMENTS));
        assert!(set
            .with_implied()
            .contains(ProcessingOptions::HAS_ATTACHMENTS));
        assert!(ProcessingOptions::empty().is_empty());
        assert_eq!(
            ProcessingOptions::empty().with_implied(),
            ProcessingOptions::empty()
        );
    }

    #[test]
    fn test_normalize_options_inserts_has_attachments_once() {
        let mut config = TargetIdentifierConfig {
            processing_options: vec![ProcessingOption::AutodownloadAttachments],
            ..Default::default()
        };
        assert!(config.normalize_options());
        assert!(!config.normalize_options());
        assert_eq!(config.processing_options.len(), 2);
        assert!(config
            .processing_options
            .contains(&ProcessingOption::HasAttachments));
    }

    #[test]
    fn test_summary() {
        let target = rule(TargetIdentifierConfig {
            label: "files".to_string(),
            server_id: Some(10),
            message_regex: Some("cat".to_string()),
            processing_options: vec![
                ProcessingOption::AutodownloadAttachments,
                ProcessingOption::HasAttachments,
            ],
            event_types: Some(vec![EventType::New, EventType::Edit]),
            ..Default::default()
        });
        let summary = target.summary();
        assert!(summary.contains("server=10"));
        assert!(summary.contains("message~cat"));
        assert!(summary.contains("events=new,edit"));
        assert!(summary.contains("autodownload"));

        let empty = rule(TargetIdentifierConfig::default());
        assert_eq!(empty.summary(), "no constraints (all events)");
    }
}
