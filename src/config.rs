//! Configuration management for Chatmon
//!
//! This module handles loading, parsing, normalizing and validating the
//! monitor profile, and applying environment variable overrides.

use crate::error::{MonitorError, Result};
use crate::monitor::target::{TargetIdentifier, TargetIdentifierConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Account type used to authenticate with the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// Bot account
    Bot,
    /// User (client) account
    Client,
}

/// Main monitor profile
///
/// Holds credentials, the three rule sets (authorized users, log targets,
/// notification watchlist) and attachment datastore settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Account type
    pub auth_type: Option<AuthType>,

    /// Gateway authentication token
    pub auth_token: Option<String>,

    /// Allow replying to commands
    pub enable_bot_reply: Option<bool>,

    /// Prefix marking a message as a command. Absent: no commands.
    /// Empty: every message is a command candidate.
    pub command_prefix: Option<String>,

    /// Rules identifying users allowed to issue commands
    pub authorized_users: Option<Vec<TargetIdentifierConfig>>,

    /// Directories attachments are downloaded to, in priority order
    pub attachment_datastore_paths: Option<Vec<PathBuf>>,

    /// Append the OS temporary directory to the datastore paths
    pub use_temp_dir: Option<bool>,

    /// Minimum attachment size (carried, not applied)
    pub min_file_size: Option<i64>,

    /// Maximum attachment size (carried, not applied)
    pub max_file_size: Option<i64>,

    /// Capacity budget, in bytes, for each datastore directory
    pub max_datastore_size: Option<i64>,

    /// Message history database location
    pub log_db_location: Option<PathBuf>,

    /// Rules selecting events to log
    #[serde(default)]
    pub log_targets: Vec<TargetIdentifierConfig>,

    /// File watchlist hits are appended to
    pub notification_text_log_location: Option<PathBuf>,

    /// Rules selecting events to raise notifications for
    #[serde(default)]
    pub notification_watchlist: Vec<TargetIdentifierConfig>,

    /// Print the message record for events no rule matched
    #[serde(default = "default_log_unmatched_events")]
    pub log_unmatched_events: bool,

    /// Diagnostic logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Diagnostic logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, stderr only)
    pub file_path: Option<PathBuf>,
}

fn default_log_unmatched_events() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_type: None,
            auth_token: None,
            enable_bot_reply: None,
            command_prefix: None,
            authorized_users: None,
            attachment_datastore_paths: None,
            use_temp_dir: None,
            min_file_size: None,
            max_file_size: None,
            max_datastore_size: None,
            log_db_location: None,
            log_targets: Vec::new(),
            notification_text_log_location: None,
            notification_watchlist: Vec::new(),
            log_unmatched_events: default_log_unmatched_events(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load a profile from file and apply environment overrides
    ///
    /// YAML and JSON profiles are both accepted.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let (config, env_warnings) = Self::load_deferred(path)?;
        for warning in &env_warnings {
            tracing::warn!("{}", warning);
        }
        Ok(config)
    }

    /// Load a profile without emitting environment override warnings
    ///
    /// Returns the rejected override messages for the caller to report once
    /// logging is initialized. The logging block already reflects any
    /// `CHATMON_LOG_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Config` if the file cannot be read or parsed
    pub fn load_deferred(path: impl AsRef<Path>) -> Result<(Self, Vec<String>)> {
        let mut config = Self::from_file(path.as_ref())?;
        let env_warnings = config.apply_env_vars();
        Ok((config, env_warnings))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!(
                "Failed to read profile {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse_str(&contents)
    }

    /// Parse a profile from a YAML or JSON string
    pub fn parse_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| MonitorError::Config(format!("Failed to parse profile: {}", e)).into())
    }

    fn apply_env_vars(&mut self) -> Vec<String> {
        let mut rejected = Vec::new();

        if let Ok(token) = std::env::var("CHATMON_AUTH_TOKEN") {
            self.auth_token = Some(token);
            tracing::debug!("Env override: CHATMON_AUTH_TOKEN");
        }

        if let Ok(prefix) = std::env::var("CHATMON_COMMAND_PREFIX") {
            tracing::debug!(prefix = %prefix, "Env override: CHATMON_COMMAND_PREFIX");
            self.command_prefix = Some(prefix);
        }

        if let Ok(size) = std::env::var("CHATMON_MAX_DATASTORE_SIZE") {
            match size.parse::<i64>() {
                Ok(v) => {
                    self.max_datastore_size = Some(v);
                    tracing::debug!(
                        max_datastore_size = v,
                        "Env override: CHATMON_MAX_DATASTORE_SIZE"
                    );
                }
                Err(_) => {
                    rejected.push(format!("Invalid value for CHATMON_MAX_DATASTORE_SIZE: {}", size));
                }
            }
        }

        if let Ok(level) = std::env::var("CHATMON_LOG_LEVEL") {
            tracing::debug!(level = %level, "Env override: CHATMON_LOG_LEVEL");
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("CHATMON_JSON_LOGS") {
            match json_logs.parse::<bool>() {
                Ok(v) => {
                    self.logging.json_format = v;
                    tracing::debug!(json_logs = v, "Env override: CHATMON_JSON_LOGS");
                }
                Err(_) => {
                    rejected.push(format!("Invalid value for CHATMON_JSON_LOGS: {}", json_logs));
                }
            }
        }

        if let Ok(log_file) = std::env::var("CHATMON_LOG_FILE") {
            tracing::debug!(log_file = %log_file, "Env override: CHATMON_LOG_FILE");
            self.logging.file_path = Some(PathBuf::from(log_file));
        }

        rejected
    }

    /// Fill in defaults and implied settings
    ///
    /// Emits a diagnostic for every assumption made. Must run before
    /// [`Config::validate`].
    pub fn normalize(&mut self) {
        if self.enable_bot_reply.is_none() {
            self.enable_bot_reply = Some(false);
            tracing::warn!("Field 'enable_bot_reply' undefined. Assuming 'false'.");
        }

        match self.command_prefix.as_deref() {
            None => tracing::info!("Field 'command_prefix' is null. Commands are disabled."),
            Some("") => tracing::info!(
                "Field 'command_prefix' is empty. All received messages will be interpreted as commands."
            ),
            Some(_) => {}
        }

        if self.authorized_users.is_none() {
            self.authorized_users = Some(Vec::new());
            tracing::warn!(
                "Field 'authorized_users' undefined. Commands will never be accepted. \
                 Specify an empty list to suppress this warning."
            );
        }

        match self.attachment_datastore_paths.as_mut() {
            None => {
                tracing::info!(
                    "Field 'attachment_datastore_paths' is null. Attachment auto-downloading disabled."
                );
            }
            Some(paths) => {
                let use_temp_dir = *self.use_temp_dir.get_or_insert_with(|| {
                    tracing::warn!("Field 'use_temp_dir' undefined. Assuming 'false'.");
                    false
                });
                if use_temp_dir {
                    paths.push(std::env::temp_dir());
                }
            }
        }

        if self.min_file_size.is_some_and(|size| size <= 0) {
            self.min_file_size = None;
        }

        if self.log_db_location.is_none() {
            tracing::info!("Field 'log_db_location' is null. Message history is not persisted.");
        }

        if self.notification_text_log_location.is_none() {
            tracing::info!(
                "Field 'notification_text_log_location' is null. Watchlist hits are only printed."
            );
        }

        let rule_sets = self
            .authorized_users
            .iter_mut()
            .flatten()
            .chain(self.log_targets.iter_mut())
            .chain(self.notification_watchlist.iter_mut());
        for target in rule_sets {
            if target.normalize_options() {
                tracing::debug!(
                    label = %target.label,
                    "Added has_attachments implied by autodownload_attachments"
                );
            }
        }
    }

    /// Validate the profile
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Config` for any setting the monitor cannot
    /// start with.
    pub fn validate(&self) -> Result<()> {
        if self.auth_type.is_none() {
            return Err(
                MonitorError::Config("Field 'auth_type' invalid or undefined".to_string()).into(),
            );
        }

        if self.auth_token.as_deref().map_or(true, str::is_empty) {
            return Err(MonitorError::Config("Field 'auth_token' undefined".to_string()).into());
        }

        for path in self.attachment_datastore_paths.iter().flatten() {
            if path.is_file() {
                return Err(MonitorError::Config(format!(
                    "attachment_datastore_path cannot be a file: {}",
                    path.display()
                ))
                .into());
            }
        }

        if self.max_file_size.is_some_and(|size| size < 0) {
            return Err(
                MonitorError::Config("Field 'max_file_size' cannot be negative".to_string()).into(),
            );
        }

        if self.max_datastore_size.is_some_and(|size| size < 0) {
            return Err(MonitorError::Config(
                "Field 'max_datastore_size' cannot be negative".to_string(),
            )
            .into());
        }

        if let Some(path) = self.log_db_location.as_ref().filter(|p| p.is_dir()) {
            return Err(MonitorError::Config(format!(
                "log_db_location cannot be a directory: {}",
                path.display()
            ))
            .into());
        }

        if let Some(path) = self
            .notification_text_log_location
            .as_ref()
            .filter(|p| p.is_dir())
        {
            return Err(MonitorError::Config(format!(
                "notification_text_log_location cannot be a directory: {}",
                path.display()
            ))
            .into());
        }

        let rule_sets = self
            .authorized_users
            .iter()
            .flatten()
            .chain(self.log_targets.iter())
            .chain(self.notification_watchlist.iter());
        for target in rule_sets {
            TargetIdentifier::new(target).map_err(|e| {
                MonitorError::Config(format!("Target identifier '{}': {}", target.label, e))
            })?;
        }

        Ok(())
    }

    /// Keep a client account from answering anyone but itself
    ///
    /// When replies are enabled on a `client` account, every authorized-user
    /// rule not bound to `self_user_id` is rebound to it.
    pub fn apply_self_reply_guard(&mut self, self_user_id: u64) {
        if self.enable_bot_reply != Some(true) || self.auth_type != Some(AuthType::Client) {
            return;
        }

        let mut rebound = 0usize;
        for target in self.authorized_users.iter_mut().flatten() {
            if target.user_id != Some(self_user_id) {
                target.user_id = Some(self_user_id);
                rebound += 1;
            }
        }

        if rebound > 0 {
            tracing::warn!(
                rebound,
                "Client account configured to reply to other users. \
                 All 'authorized_users' entries have been bound to the account's own user id."
            );
        }
    }

    /// Per-directory capacity budget in bytes
    pub fn datastore_budget(&self) -> Option<u64> {
        self.max_datastore_size.and_then(|size| u64::try_from(size).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::target::ProcessingOption;
    use serial_test::serial;

    const MINIMAL: &str = "auth_type: bot\nauth_token: abc123\n";

    #[test]
    fn test_parse_minimal_yaml_profile() {
        let config = Config::parse_str(MINIMAL).unwrap();
        assert_eq!(config.auth_type, Some(AuthType::Bot));
        assert_eq!(config.auth_token.as_deref(), Some("abc123"));
        assert!(config.log_unmatched_events);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_json_profile() {
        let json = r#"{
            "auth_type": "client",
            "auth_token": "t",
            "command_prefix": "!",
            "log_targets": [
                { "label": "deletes", "server_id": 10, "event_types": ["delete"] }
            ],
            "max_datastore_size": 1048576
        }"#;
        let config = Config::parse_str(json).unwrap();
        assert_eq!(config.auth_type, Some(AuthType::Client));
        assert_eq!(config.log_targets[0].server_id, Some(10));
        assert_eq!(config.datastore_budget(), Some(1_048_576));
    }

    #[test]
    fn test_validate_requires_auth_fields() {
        let missing_type = Config::parse_str("auth_token: abc\n").unwrap();
        assert!(missing_type
            .validate()
            .unwrap_err()
            .to_string()
            .contains("auth_type"));

        let empty_token = Config::parse_str("auth_type: bot\nauth_token: \"\"\n").unwrap();
        assert!(empty_token
            .validate()
            .unwrap_err()
            .to_string()
            .contains("auth_token"));
    }

    #[test]
    fn test_validate_rejects_negative_sizes() {
        let mut config = Config::parse_str(MINIMAL).unwrap();
        config.max_datastore_size = Some(-1);
        assert!(config.validate().is_err());

        config.max_datastore_size = None;
        config.max_file_size = Some(-5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_file_as_datastore_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::parse_str(MINIMAL).unwrap();
        config.attachment_datastore_paths = Some(vec![file.path().to_path_buf()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_directory_log_locations() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::parse_str(MINIMAL).unwrap();
        config.notification_text_log_location = Some(dir.path().to_path_buf());
        assert!(config.validate().is_err());

        config.notification_text_log_location = None;
        config.log_db_location = Some(dir.path().to_path_buf());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_invalid_regex() {
        let mut config = Config::parse_str(MINIMAL).unwrap();
        config.notification_watchlist.push(TargetIdentifierConfig {
            label: "broken".to_string(),
            message_regex: Some("[a-".to_string()),
            ..Default::default()
        });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("broken"));
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let mut config = Config::parse_str(MINIMAL).unwrap();
        config.min_file_size = Some(0);
        config.normalize();

        assert_eq!(config.enable_bot_reply, Some(false));
        assert_eq!(config.authorized_users, Some(Vec::new()));
        assert_eq!(config.min_file_size, None);
        assert_eq!(config.use_temp_dir, None);
    }

    #[test]
    fn test_normalize_appends_temp_dir() {
        let mut config = Config::parse_str(MINIMAL).unwrap();
        config.attachment_datastore_paths = Some(vec![PathBuf::from("/srv/archive")]);
        config.use_temp_dir = Some(true);
        config.normalize();

        let paths = config.attachment_datastore_paths.unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1], std::env::temp_dir());
    }

    #[test]
    fn test_normalize_autodownload_implies_has_attachments() {
        let yaml = "auth_type: bot\nauth_token: t\n\
                    log_targets:\n  - label: a\n    processing_options: [autodownload_attachments]\n\
                    notification_watchlist:\n  - label: b\n    processing_options: [autodownload_attachments]\n";
        let mut config = Config::parse_str(yaml).unwrap();
        config.normalize();

        for target in config
            .log_targets
            .iter()
            .chain(config.notification_watchlist.iter())
        {
            assert!(target
                .processing_options
                .contains(&ProcessingOption::HasAttachments));
        }
    }

    #[test]
    fn test_self_reply_guard_rebinds_client_rules() {
        let yaml = "auth_type: client\nauth_token: t\nenable_bot_reply: true\n\
                    authorized_users:\n  - label: me\n    user_id: 1\n  - label: friend\n    user_id: 2\n  - label: anyone\n";
        let mut config = Config::parse_str(yaml).unwrap();
        config.apply_self_reply_guard(1);

        let users = config.authorized_users.unwrap();
        assert!(users.iter().all(|u| u.user_id == Some(1)));
    }

    #[test]
    fn test_self_reply_guard_ignores_bot_accounts() {
        let yaml = "auth_type: bot\nauth_token: t\nenable_bot_reply: true\n\
                    authorized_users:\n  - label: friend\n    user_id: 2\n";
        let mut config = Config::parse_str(yaml).unwrap();
        config.apply_self_reply_guard(1);
        assert_eq!(config.authorized_users.unwrap()[0].user_id, Some(2));
    }

    #[test]
    fn test_load_missing_profile_fails() {
        let err = Config::load("/nonexistent/chatmon/profile.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read profile"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, MINIMAL.as_bytes()).unwrap();

        std::env::set_var("CHATMON_AUTH_TOKEN", "from-env");
        std::env::set_var("CHATMON_MAX_DATASTORE_SIZE", "2048");
        std::env::set_var("CHATMON_JSON_LOGS", "not-a-bool");

        let config = Config::load(file.path()).unwrap();

        std::env::remove_var("CHATMON_AUTH_TOKEN");
        std::env::remove_var("CHATMON_MAX_DATASTORE_SIZE");
        std::env::remove_var("CHATMON_JSON_LOGS");

        assert_eq!(config.auth_token.as_deref(), Some("from-env"));
        assert_eq!(config.max_datastore_size, Some(2048));
        assert!(!config.logging.json_format);
    }

    #[test]
    #[serial]
    fn test_load_deferred_reports_rejected_env_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, MINIMAL.as_bytes()).unwrap();

        std::env::set_var("CHATMON_MAX_DATASTORE_SIZE", "not-a-number");
        std::env::set_var("CHATMON_JSON_LOGS", "true");

        let (config, warnings) = Config::load_deferred(file.path()).unwrap();

        std::env::remove_var("CHATMON_MAX_DATASTORE_SIZE");
        std::env::remove_var("CHATMON_JSON_LOGS");

        assert_eq!(config.max_datastore_size, None);
        assert!(config.logging.json_format);
        assert_eq!(
            warnings,
            vec!["Invalid value for CHATMON_MAX_DATASTORE_SIZE: not-a-number".to_string()]
        );
    }
}
