//! Contract with the external messaging-protocol client.
//!
//! The wire protocol itself is a collaborator concern. The dispatch core
//! consumes the client through [`ChatClient`] and receives inbound traffic as
//! [`ClientEvent`]s on a channel owned by the collaborator glue.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identifies one protocol message, for read receipts, quoting and deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageKey {
    /// Protocol-assigned message id.
    pub id: String,
    /// Conversation the message belongs to (individual or group identifier).
    pub remote_jid: String,
    /// Sender within a group origin, when distinct from `remote_jid`.
    pub participant: Option<String>,
    /// Whether the message was sent by the bot's own account.
    pub from_me: bool,
}

/// Text body of a plain or extended text message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBody {
    pub text: String,
    /// Key of the message this one replies to, when quoting.
    pub quoted: Option<MessageKey>,
}

/// A media attachment (image, video, audio or document).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaBody {
    pub caption: Option<String>,
    pub mime_type: Option<String>,
}

/// A shared contact card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactBody {
    pub display_name: Option<String>,
    pub vcard: Option<String>,
}

/// A shared location pin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationBody {
    pub latitude: f64,
    pub longitude: f64,
}

/// Typed payload union of an inbound message. At most one field per message
/// kind is populated; classification precedence is handled by the router.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePayload {
    pub conversation: Option<String>,
    pub extended_text: Option<TextBody>,
    pub image: Option<MediaBody>,
    pub video: Option<MediaBody>,
    pub audio: Option<MediaBody>,
    pub document: Option<MediaBody>,
    pub contact: Option<ContactBody>,
    pub location: Option<LocationBody>,
}

/// A raw inbound message as delivered by the protocol client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub key: MessageKey,
    /// Sender display name, when the protocol provides one.
    pub push_name: Option<String>,
    /// Unix timestamp of the message, in seconds.
    pub timestamp: i64,
    pub payload: Option<MessagePayload>,
}

/// Connection lifecycle updates emitted by the protocol client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConnectionUpdate {
    Connecting,
    Open,
    Close {
        reason: String,
        /// Whether the collaborator intends to reconnect (false when logged out).
        should_reconnect: bool,
    },
}

/// Events delivered by the client glue to the gateway loop.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connection(ConnectionUpdate),
    Messages(Vec<RawMessage>),
}

/// Role of a participant inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Member,
    Admin,
    Superadmin,
}

/// One entry of a group's participant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupParticipant {
    /// Full identifier of the participant.
    pub jid: String,
    pub role: ParticipantRole,
}

/// Group metadata as reported by the protocol client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMetadata {
    /// Display name of the group.
    pub subject: String,
    pub participants: Vec<GroupParticipant>,
    /// Announce-only flag: when set, only admins may send.
    pub locked: bool,
}

/// Outbound content handed to the protocol client for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutgoingContent {
    Text {
        text: String,
        /// Message to quote, when replying.
        quoted: Option<MessageKey>,
    },
    /// Ask the client to delete an earlier message by its key.
    Delete { key: MessageKey },
}

impl OutgoingContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            quoted: None,
        }
    }
}

/// Minimal interface the dispatch core consumes from the protocol client.
///
/// Every method may fail; callers degrade gracefully per the error handling
/// rules (log and continue, or log and drop the send).
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Fetch current metadata for a group conversation.
    async fn fetch_group_metadata(&self, group_jid: &str) -> Result<GroupMetadata>;

    /// Deliver content to a conversation. Single attempt, no retry.
    async fn send_message(&self, destination_jid: &str, content: OutgoingContent) -> Result<()>;

    /// Mark inbound messages as read. Best-effort.
    async fn mark_read(&self, keys: &[MessageKey]) -> Result<()>;
}

/// Whether an identifier names a group conversation.
pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with("@g.us")
}

/// Numeric account portion of an identifier (everything before `@`).
pub fn numeric_id(jid: &str) -> &str {
    jid.split('@').next().unwrap_or(jid)
}
