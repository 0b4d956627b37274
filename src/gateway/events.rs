//! Typed events delivered by the chat gateway.
//!
//! The gateway client is an external collaborator. These structs describe
//! the subset of its event model the monitor consumes, deserialized from
//! one JSON object per event.
//!
//! # Example
//!
//! ```rust
//! use chatmon::gateway::GatewayEvent;
//!
//! let json = r#"{
//!   "type": "messages_bulk_deleted",
//!   "channel": { "kind": "guild", "id": 20, "guild_id": 10 },
//!   "message_ids": [1, 2, 3]
//! }"#;
//!
//! let event: GatewayEvent = serde_json::from_str(json).unwrap();
//! assert_eq!(event.channel().id, 20);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

/// Kind of channel an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Text channel owned by a guild (server)
    Guild,
    /// Direct (private) message channel
    Direct,
    /// Group direct message channel
    Group,
    /// Voice channel
    Voice,
    /// Channel kind not recognized by this client
    #[serde(other)]
    Unknown,
}

/// Channel an event was delivered on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Channel kind
    pub kind: ChannelKind,

    /// Channel ID
    pub id: u64,

    /// Channel name (unnamed groups and DMs may have none)
    #[serde(default)]
    pub name: Option<String>,

    /// Owning guild ID, for guild channels
    #[serde(default)]
    pub guild_id: Option<u64>,

    /// Owning guild name, for guild channels
    #[serde(default)]
    pub guild_name: Option<String>,
}

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// User ID
    pub id: u64,

    /// Account name
    pub name: String,

    /// Guild nickname, if the author has one in this guild
    #[serde(default)]
    pub nickname: Option<String>,

    /// Whether the author is a bot account
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    /// Name shown in guild channels: the nickname when set, otherwise the account name.
    pub fn effective_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }
}

/// Remote attachment descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment ID
    pub id: u64,

    /// Original file name, including extension
    pub filename: String,

    /// Size in bytes
    pub size: u64,

    /// Download URL
    pub url: Url,

    /// Proxied download URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<Url>,
}

/// Message payload carried by create and update events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Message ID
    pub id: u64,

    /// Message author
    pub author: Author,

    /// Human-readable content
    pub content: String,

    /// Content with formatting markup removed; falls back to `content`
    #[serde(default)]
    pub stripped_content: Option<String>,

    /// Content exactly as sent; falls back to `content`
    #[serde(default)]
    pub raw_content: Option<String>,

    /// Attachments
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Embeds, kept opaque
    #[serde(default)]
    pub embeds: Vec<JsonValue>,

    /// Whether the message has been edited
    #[serde(default)]
    pub edited: bool,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last edit time
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,

    /// Whether the message was posted through a webhook
    #[serde(default)]
    pub webhook: bool,
}

impl MessagePayload {
    /// Content used for rule matching.
    pub fn stripped(&self) -> &str {
        self.stripped_content.as_deref().unwrap_or(&self.content)
    }

    /// Content used for command detection.
    pub fn raw(&self) -> &str {
        self.raw_content.as_deref().unwrap_or(&self.content)
    }

    /// Author name shown on the record.
    ///
    /// Webhook authors have no member nickname, so the account name is used.
    pub fn author_display_name(&self) -> &str {
        if self.webhook {
            &self.author.name
        } else {
            self.author.effective_name()
        }
    }

    /// Timestamp shown on the record: the edit time for edited messages.
    pub fn display_time(&self) -> DateTime<Utc> {
        match (self.edited, self.edited_at) {
            (true, Some(edited_at)) => edited_at,
            _ => self.created_at,
        }
    }
}

/// Event delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A new message was posted
    MessageCreated {
        channel: ChannelRef,
        message: MessagePayload,
    },

    /// An existing message was edited
    MessageUpdated {
        channel: ChannelRef,
        message: MessagePayload,
    },

    /// A message was deleted; its content is not available
    MessageDeleted { channel: ChannelRef, message_id: u64 },

    /// Several messages were deleted at once
    MessagesBulkDeleted {
        channel: ChannelRef,
        message_ids: Vec<u64>,
    },
}

impl GatewayEvent {
    /// Channel the event was delivered on.
    pub fn channel(&self) -> &ChannelRef {
        match self {
            GatewayEvent::MessageCreated { channel, .. }
            | GatewayEvent::MessageUpdated { channel, .. }
            | GatewayEvent::MessageDeleted { channel, .. }
            | GatewayEvent::MessagesBulkDeleted { channel, .. } => channel,
        }
    }

    /// Message payload, for create and update events.
    pub fn message(&self) -> Option<&MessagePayload> {
        match self {
            GatewayEvent::MessageCreated { message, .. }
            | GatewayEvent::MessageUpdated { message, .. } => Some(message),
            GatewayEvent::MessageDeleted { .. } | GatewayEvent::MessagesBulkDeleted { .. } => None,
        }
    }

    /// Short name used in log fields.
    pub fn kind_name(&self) -> &'static str {
        match self {
            GatewayEvent::MessageCreated { .. } => "message_created",
            GatewayEvent::MessageUpdated { .. } => "message_updated",
            GatewayEvent::MessageDeleted { .. } => "message_deleted",
            GatewayEvent::MessagesBulkDeleted { .. } => "messages_bulk_deleted",
        }
    }
}
