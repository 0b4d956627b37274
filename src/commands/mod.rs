/*!
Command handlers for the CLI

- `watch`: Run gateway events through the monitor
- `check`: Validate a profile and summarize its rules

Both handlers expect a configuration that has already been normalized and
validated by the entrypoint.
*/

use crate::config::Config;
use crate::error::Result;

// Event monitoring command handler
pub mod watch {
    //! Feeds a replayed gateway event stream into the dispatcher.

    use super::*;
    use crate::datastore::{HttpFetcher, DOWNLOAD_TIMEOUT};
    use crate::gateway::{EventSource, ReplayInput, ReplaySource};
    use crate::monitor::dispatcher::EventDispatcher;
    use crate::monitor::output::{OutputSink, StdoutSink};
    use std::path::PathBuf;

    /// Monitor events until the stream ends, printing records to stdout.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `events` - JSON-lines event file; standard input when `None`
    /// * `dry_run` - Disable attachment auto-download
    ///
    /// # Returns
    ///
    /// Returns the number of events processed
    pub async fn run_watch(config: &Config, events: Option<PathBuf>, dry_run: bool) -> Result<usize> {
        let input = match events {
            Some(path) => ReplayInput::File(path),
            None => ReplayInput::Stdin,
        };
        let (delivered, _) = run_with_sink(config, input, dry_run, StdoutSink).await?;
        Ok(delivered)
    }

    /// Monitor events from `input`, writing records to `sink`.
    ///
    /// Returns the number of events processed together with the sink.
    pub async fn run_with_sink<S: OutputSink>(
        config: &Config,
        input: ReplayInput,
        dry_run: bool,
        sink: S,
    ) -> Result<(usize, S)> {
        if dry_run {
            tracing::warn!("Dry run: attachment auto-download disabled");
        }

        let fetcher = HttpFetcher::new(DOWNLOAD_TIMEOUT)?;
        let mut dispatcher =
            EventDispatcher::from_config(config, fetcher, sink)?.with_autodownload(!dry_run);

        tracing::info!(
            log_targets = dispatcher.engine().log_targets().len(),
            watchlist = dispatcher.engine().watchlist().len(),
            authorized_users = dispatcher.engine().authorized_users().len(),
            "Monitor started"
        );

        let mut source = ReplaySource::new(input);
        let delivered = source.run(&mut dispatcher).await?;
        Ok((delivered, dispatcher.into_sink()))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::monitor::output::BufferSink;
        use std::io::Write;

        const EVENTS: &str = r#"{"type":"message_created","channel":{"kind":"guild","id":20,"name":"general","guild_id":10,"guild_name":"Home"},"message":{"id":1,"author":{"id":42,"name":"alice"},"content":"!ban user","created_at":"2017-06-20T12:00:00Z"}}
{"type":"messages_bulk_deleted","channel":{"kind":"guild","id":20,"name":"general","guild_id":10,"guild_name":"Home"},"message_ids":[3,4]}
"#;

        const PROFILE: &str = r#"
auth_type: bot
auth_token: abc
command_prefix: "!"
authorized_users:
  - label: admins
    user_id: 42
    event_types: [new]
log_targets:
  - label: deletes
    server_id: 10
    event_types: [delete]
"#;

        #[tokio::test]
        async fn test_run_with_sink_processes_every_event() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(EVENTS.as_bytes()).unwrap();
            let config = Config::parse_str(PROFILE).unwrap();

            let (delivered, sink) = run_with_sink(
                &config,
                ReplayInput::File(file.path().to_path_buf()),
                true,
                BufferSink::new(),
            )
            .await
            .unwrap();

            assert_eq!(delivered, 2);
            let output = sink.contents();
            assert!(output.contains("as per identifier 'admins'"));
            assert!(output.contains("(i) Logging for: deletes"));
            assert!(output.contains("MESSAGES DELETED: 3 4"));
        }

        #[tokio::test]
        async fn test_missing_event_file_fails() {
            let config = Config::parse_str(PROFILE).unwrap();
            let result = run_watch(&config, Some(PathBuf::from("/nonexistent/events.jsonl")), true).await;
            assert!(result.is_err());
        }
    }
}

// Profile inspection command handler
pub mod check {
    //! Prints a summary of a validated profile.

    use super::*;
    use crate::monitor::matcher::MatchingEngine;
    use crate::monitor::target::TargetIdentifier;
    use std::fmt::Write;

    /// Print the profile summary to stdout.
    pub fn run_check(config: &Config) -> Result<()> {
        print!("{}", render_summary(config)?);
        Ok(())
    }

    /// Render a human-readable summary of the profile's rules and datastore.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule fails to compile.
    pub fn render_summary(config: &Config) -> Result<String> {
        let engine = MatchingEngine::from_config(config)?;
        let mut out = String::new();

        writeln!(out, "Profile OK")?;
        match config.command_prefix.as_deref() {
            None => writeln!(out, "Command prefix: (commands disabled)")?,
            Some("") => writeln!(out, "Command prefix: (every message)")?,
            Some(prefix) => writeln!(out, "Command prefix: {}", prefix)?,
        }

        write_rules(&mut out, "Authorized users", engine.authorized_users())?;
        write_rules(&mut out, "Log targets", engine.log_targets())?;
        write_rules(&mut out, "Notification watchlist", engine.watchlist())?;

        match &config.attachment_datastore_paths {
            None => writeln!(out, "Datastore: auto-download disabled")?,
            Some(paths) => {
                let budget = config
                    .datastore_budget()
                    .map(|b| format!("{} bytes per path", b))
                    .unwrap_or_else(|| "unlimited".to_string());
                writeln!(out, "Datastore ({}):", budget)?;
                for path in paths {
                    writeln!(out, "  {}", path.display())?;
                }
            }
        }

        Ok(out)
    }

    fn write_rules(out: &mut String, title: &str, rules: &[TargetIdentifier]) -> Result<()> {
        writeln!(out, "{} ({}):", title, rules.len())?;
        for rule in rules {
            writeln!(out, "  {}: {}", rule.label, rule.summary())?;
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_render_summary_lists_rules() {
            let config = Config::parse_str(
                r#"
auth_type: bot
auth_token: abc
command_prefix: ""
log_targets:
  - label: everything
  - label: files
    processing_options: [autodownload_attachments]
attachment_datastore_paths: ["/tmp/chatmon-store"]
max_datastore_size: 1024
"#,
            )
            .unwrap();

            let summary = render_summary(&config).unwrap();
            assert!(summary.starts_with("Profile OK\n"));
            assert!(summary.contains("Command prefix: (every message)"));
            assert!(summary.contains("Authorized users (0):"));
            assert!(summary.contains("  everything: no constraints (all events)"));
            assert!(summary.contains("  files: autodownload"));
            assert!(summary.contains("Datastore (1024 bytes per path):"));
        }

        #[test]
        fn test_render_summary_without_datastore() {
            let config = Config::parse_str("auth_type: bot\nauth_token: abc\n").unwrap();
            let summary = render_summary(&config).unwrap();
            assert!(summary.contains("Command prefix: (commands disabled)"));
            assert!(summary.contains("Datastore: auto-download disabled"));
        }
    }
}
