use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("profile.yaml");
    fs::write(&config_path, contents).expect("failed to write profile");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn temp_events_file(dir: &TempDir, lines: &[&str]) -> PathBuf {
    let events_path = dir.path().join("events.jsonl");
    fs::write(&events_path, lines.join("\n")).expect("failed to write events file");
    events_path
}

#[allow(dead_code)]
pub const GUILD_CHANNEL: &str =
    r#"{"kind":"guild","id":20,"name":"general","guild_id":10,"guild_name":"Home"}"#;

#[allow(dead_code)]
pub fn created_event(message_id: u64, author_id: u64, content: &str, attachments: &str) -> String {
    format!(
        r#"{{"type":"message_created","channel":{},"message":{{"id":{},"author":{{"id":{},"name":"user{}"}},"content":"{}","attachments":{},"created_at":"2017-06-20T12:00:00Z"}}}}"#,
        GUILD_CHANNEL, message_id, author_id, author_id, content, attachments
    )
}

#[allow(dead_code)]
pub fn bulk_deleted_event(message_ids: &[u64]) -> String {
    let ids: Vec<String> = message_ids.iter().map(u64::to_string).collect();
    format!(
        r#"{{"type":"messages_bulk_deleted","channel":{},"message_ids":[{}]}}"#,
        GUILD_CHANNEL,
        ids.join(",")
    )
}
