//! Inbound message normalization: payload classification, command parsing and
//! the per-message context handed to command handlers.

use std::sync::Arc;

use tracing::error;

use crate::client::{ChatClient, MessageKey, MessagePayload, OutgoingContent};

/// Message kinds recognized by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Contact,
    Location,
}

/// Classify a payload by presence of its fields, plain text first, then each
/// media kind in fixed precedence order. `None` means no recognized kind.
pub fn classify(payload: &MessagePayload) -> Option<MessageKind> {
    if payload.conversation.is_some() || payload.extended_text.is_some() {
        Some(MessageKind::Text)
    } else if payload.image.is_some() {
        Some(MessageKind::Image)
    } else if payload.video.is_some() {
        Some(MessageKind::Video)
    } else if payload.audio.is_some() {
        Some(MessageKind::Audio)
    } else if payload.document.is_some() {
        Some(MessageKind::Document)
    } else if payload.contact.is_some() {
        Some(MessageKind::Contact)
    } else if payload.location.is_some() {
        Some(MessageKind::Location)
    } else {
        None
    }
}

/// Best-effort display text for a classified payload: the body for text
/// messages, the caption for captioned media, nothing for the rest.
pub fn display_text(kind: MessageKind, payload: &MessagePayload) -> Option<String> {
    match kind {
        MessageKind::Text => payload
            .extended_text
            .as_ref()
            .map(|t| t.text.clone())
            .or_else(|| payload.conversation.clone()),
        MessageKind::Image => payload.image.as_ref().and_then(|m| m.caption.clone()),
        MessageKind::Video => payload.video.as_ref().and_then(|m| m.caption.clone()),
        MessageKind::Document => payload.document.as_ref().and_then(|m| m.caption.clone()),
        MessageKind::Audio | MessageKind::Contact | MessageKind::Location => None,
    }
}

/// The user a message came from.
#[derive(Debug, Clone)]
pub struct Sender {
    pub display_name: String,
    /// Numeric account portion of the identifier.
    pub number: String,
    /// Full identifier.
    pub jid: String,
}

/// The conversation a message arrived in.
#[derive(Debug, Clone)]
pub struct Origin {
    /// Identifier replies are addressed to: the group if the message came
    /// from a group, otherwise the sender.
    pub jid: String,
    pub is_group: bool,
    /// Group display name, when available.
    pub group_name: Option<String>,
    /// Announce-only flag of the group, when available.
    pub locked: bool,
}

/// A prefix-parsed command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lower-cased command name (first token after the prefix).
    pub name: String,
    pub args: Vec<String>,
}

/// Split a trimmed message into a command invocation, if it starts with the
/// configured prefix and carries at least a name token.
pub fn parse_command(trimmed: &str, prefix: &str) -> Option<ParsedCommand> {
    let rest = trimmed.strip_prefix(prefix)?;
    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?.to_lowercase();
    Some(ParsedCommand {
        name,
        args: tokens.map(String::from).collect(),
    })
}

/// Everything a command handler gets about one inbound message, including the
/// send/reply capabilities bound to its origin. Created by the router, lives
/// for the duration of a single dispatch.
pub struct MessageContext {
    pub message_id: String,
    /// Raw protocol key, needed for read receipts, quoting and deletion.
    pub raw_key: MessageKey,
    pub kind: MessageKind,
    pub text: String,
    pub trimmed_text: String,
    /// Unix timestamp of the message, in seconds.
    pub timestamp: i64,
    pub sender: Sender,
    pub origin: Origin,
    /// Set iff the message is a command invocation; the executor only runs
    /// when this is populated.
    pub parsed_command: Option<ParsedCommand>,
    /// Key of the message this one quotes, when replying.
    pub quoted: Option<MessageKey>,
    pub(crate) client: Arc<dyn ChatClient>,
    pub(crate) prefix: String,
}

impl MessageContext {
    /// Handle to the protocol client, for commands that need capabilities
    /// beyond the plain-text helpers below.
    pub fn client(&self) -> &Arc<dyn ChatClient> {
        &self.client
    }

    /// Send plain text to the originating conversation. Delivery failures are
    /// logged and swallowed (single attempt).
    pub async fn send_to_origin(&self, text: impl Into<String>) {
        self.deliver(&self.origin.jid, OutgoingContent::text(text))
            .await;
    }

    /// Reply in the originating conversation, quoting the inbound message.
    pub async fn reply_in_origin(&self, text: impl Into<String>) {
        self.deliver(
            &self.origin.jid,
            OutgoingContent::Text {
                text: text.into(),
                quoted: Some(self.raw_key.clone()),
            },
        )
        .await;
    }

    /// Send plain text to the sender directly, outside any group.
    pub async fn send_privately(&self, text: impl Into<String>) {
        self.deliver(&self.sender.jid, OutgoingContent::text(text))
            .await;
    }

    /// Tell the user how the command is meant to be invoked.
    pub async fn reply_usage(&self, usage: &str) {
        let name = self
            .parsed_command
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or_default();
        self.reply_in_origin(format!("Usage: {}{} {}", self.prefix, name, usage))
            .await;
    }

    async fn deliver(&self, destination: &str, content: OutgoingContent) {
        if let Err(e) = self.client.send_message(destination, content).await {
            error!(
                "Failed to send message to {}: {:#}",
                destination, e
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod test_ctx {
    use super::*;
    use crate::client::GroupMetadata;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Scripted in-memory client for unit tests: serves canned group
    /// metadata and records outbound sends.
    pub struct ScriptedClient {
        pub metadata: Option<GroupMetadata>,
        pub sent: Mutex<Vec<(String, OutgoingContent)>>,
    }

    impl ScriptedClient {
        pub fn new(metadata: Option<GroupMetadata>) -> Arc<Self> {
            Arc::new(Self {
                metadata,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn fetch_group_metadata(&self, _group_jid: &str) -> Result<GroupMetadata> {
            self.metadata
                .clone()
                .ok_or_else(|| anyhow!("no metadata scripted"))
        }

        async fn send_message(
            &self,
            destination_jid: &str,
            content: OutgoingContent,
        ) -> Result<()> {
            self.sent
                .lock()
                .await
                .push((destination_jid.to_string(), content));
            Ok(())
        }

        async fn mark_read(&self, _keys: &[MessageKey]) -> Result<()> {
            Ok(())
        }
    }

    /// Context for a text message in a group, parsed against prefix `!`.
    pub fn group_context(
        client: Arc<dyn ChatClient>,
        number: &str,
        group_jid: &str,
        text: &str,
    ) -> MessageContext {
        let sender_jid = format!("{}@s.whatsapp.net", number);
        MessageContext {
            message_id: "MSG-1".to_string(),
            raw_key: MessageKey {
                id: "MSG-1".to_string(),
                remote_jid: group_jid.to_string(),
                participant: Some(sender_jid.clone()),
                from_me: false,
            },
            kind: MessageKind::Text,
            text: text.to_string(),
            trimmed_text: text.trim().to_string(),
            timestamp: 1_700_000_000,
            sender: Sender {
                display_name: "Test User".to_string(),
                number: number.to_string(),
                jid: sender_jid,
            },
            origin: Origin {
                jid: group_jid.to_string(),
                is_group: true,
                group_name: Some("Test Group".to_string()),
                locked: false,
            },
            parsed_command: parse_command(text.trim(), "!"),
            quoted: None,
            client,
            prefix: "!".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MediaBody, TextBody};

    #[test]
    fn test_classify_precedence() {
        let mut payload = MessagePayload {
            conversation: Some("hi".to_string()),
            image: Some(MediaBody::default()),
            ..Default::default()
        };
        // Plain text wins over any media field.
        assert_eq!(classify(&payload), Some(MessageKind::Text));

        payload.conversation = None;
        assert_eq!(classify(&payload), Some(MessageKind::Image));
    }

    #[test]
    fn test_classify_unknown_payload() {
        assert_eq!(classify(&MessagePayload::default()), None);
    }

    #[test]
    fn test_image_caption_is_display_text() {
        let payload = MessagePayload {
            image: Some(MediaBody {
                caption: Some("look at this".to_string()),
                mime_type: Some("image/jpeg".to_string()),
            }),
            ..Default::default()
        };
        let kind = classify(&payload).expect("image payload should classify");
        assert_eq!(kind, MessageKind::Image);
        assert_eq!(display_text(kind, &payload).as_deref(), Some("look at this"));
    }

    #[test]
    fn test_audio_has_no_display_text() {
        let payload = MessagePayload {
            audio: Some(MediaBody::default()),
            ..Default::default()
        };
        assert_eq!(display_text(MessageKind::Audio, &payload), None);
    }

    #[test]
    fn test_extended_text_preferred_over_conversation() {
        let payload = MessagePayload {
            conversation: Some("plain".to_string()),
            extended_text: Some(TextBody {
                text: "extended".to_string(),
                quoted: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            display_text(MessageKind::Text, &payload).as_deref(),
            Some("extended")
        );
    }

    #[test]
    fn test_parse_command() {
        let parsed = parse_command("!Kick 12345 spam", "!").expect("should parse");
        assert_eq!(parsed.name, "kick");
        assert_eq!(parsed.args, vec!["12345", "spam"]);
    }

    #[test]
    fn test_parse_command_requires_prefix() {
        assert_eq!(parse_command("kick 12345", "!"), None);
    }

    #[test]
    fn test_parse_bare_prefix_is_not_a_command() {
        assert_eq!(parse_command("!", "!"), None);
        assert_eq!(parse_command("!   ", "!"), None);
    }

    #[test]
    fn test_parse_command_collapses_whitespace() {
        let parsed = parse_command("!ping   a    b", "!").expect("should parse");
        assert_eq!(parsed.args, vec!["a", "b"]);
    }
}
