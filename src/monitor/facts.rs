//! Event fact extraction
//!
//! Normalizes a gateway event into the flat, partially-populated
//! [`EventFacts`] tuple consumed by rule matching. Every field is optional:
//! an absent fact never disqualifies a rule.

use crate::gateway::{ChannelKind, ChannelRef, GatewayEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Kind of message event, as seen by rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Message created
    New,
    /// Message edited
    Edit,
    /// Message deleted
    Delete,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventType::New => "new",
            EventType::Edit => "edit",
            EventType::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Facts derived from a single event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFacts {
    pub server_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub user_id: Option<u64>,
    /// Stripped message content, when the event carries a message body
    pub message_content: Option<String>,
    pub has_attachment: Option<bool>,
    pub event_type: Option<EventType>,
}

/// Result of fact extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Facts that can be matched against rules
    Facts(EventFacts),
    /// Event must not be matched at all
    NonMatchable,
}

impl Extraction {
    /// Facts, if the event is matchable.
    pub fn facts(&self) -> Option<&EventFacts> {
        match self {
            Extraction::Facts(facts) => Some(facts),
            Extraction::NonMatchable => None,
        }
    }
}

/// Extract rule-matching facts from a gateway event.
///
/// Voice channels are never matchable. Deletions carry no message payload,
/// so only scope facts and the event type are populated for them.
///
/// # Examples
///
/// ```
/// use chatmon::gateway::GatewayEvent;
/// use chatmon::monitor::facts::{extract_facts, EventType};
///
/// let event: GatewayEvent = serde_json::from_str(
///     r#"{"type":"messages_bulk_deleted","channel":{"kind":"guild","id":20,"guild_id":10},"message_ids":[1]}"#,
/// ).unwrap();
///
/// let facts = extract_facts(&event).facts().cloned().unwrap();
/// assert_eq!(facts.server_id, Some(10));
/// assert_eq!(facts.channel_id, Some(20));
/// assert_eq!(facts.event_type, Some(EventType::Delete));
/// ```
pub fn extract_facts(event: &GatewayEvent) -> Extraction {
    let channel = event.channel();
    if channel.kind == ChannelKind::Voice {
        warn!(channel_id = channel.id, "Encountered voice-type message, assumed non-matching");
        return Extraction::NonMatchable;
    }

    let server_id = resolve_server_id(channel);

    let facts = match event {
        GatewayEvent::MessageCreated { message, .. } => {
            if message.edited {
                warn!(message_id = message.id, "Created event carries an edited message");
            }
            EventFacts {
                server_id,
                channel_id: Some(channel.id),
                user_id: Some(message.author.id),
                message_content: Some(message.stripped().to_string()),
                has_attachment: Some(!message.attachments.is_empty()),
                event_type: Some(EventType::New),
            }
        }
        GatewayEvent::MessageUpdated { message, .. } => {
            if !message.edited {
                warn!(message_id = message.id, "Updated event carries a non-edited message");
            }
            EventFacts {
                server_id,
                channel_id: Some(channel.id),
                user_id: Some(message.author.id),
                message_content: Some(message.stripped().to_string()),
                has_attachment: Some(!message.attachments.is_empty()),
                event_type: Some(EventType::Edit),
            }
        }
        // No history lookup: the deleted message's channel, author and
        // content are unknown.
        GatewayEvent::MessageDeleted { .. } => EventFacts {
            server_id,
            event_type: Some(EventType::Delete),
            ..Default::default()
        },
        GatewayEvent::MessagesBulkDeleted { .. } => EventFacts {
            server_id,
            channel_id: Some(channel.id),
            event_type: Some(EventType::Delete),
            ..Default::default()
        },
    };

    Extraction::Facts(facts)
}

/// Server scope of a channel: the group for group DMs, the channel itself
/// for direct messages, the owning guild for guild channels.
fn resolve_server_id(channel: &ChannelRef) -> Option<u64> {
    match channel.kind {
        ChannelKind::Group | ChannelKind::Direct => Some(channel.id),
        ChannelKind::Guild => {
            if channel.guild_id.is_none() {
                warn!(channel_id = channel.id, "Guild channel without guild id");
            }
            channel.guild_id
        }
        ChannelKind::Unknown => {
            error!(
                channel_id = channel.id,
                channel_name = channel.name.as_deref().unwrap_or("(unnamed group)"),
                "Encountered unknown channel type"
            );
            None
        }
        ChannelKind::Voice => None,
    }
}
