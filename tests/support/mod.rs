//! Shared fixtures: a scripted protocol client and raw-message builders.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use wabot::client::{
    ChatClient, GroupMetadata, GroupParticipant, MediaBody, MessageKey, MessagePayload,
    OutgoingContent, ParticipantRole, RawMessage,
};
use wabot::config::Config;

/// In-memory protocol client: serves canned group metadata and records
/// every outbound call.
pub struct RecordingClient {
    pub groups: HashMap<String, GroupMetadata>,
    pub fail_metadata: bool,
    pub sent: Mutex<Vec<(String, OutgoingContent)>>,
    pub read: Mutex<Vec<MessageKey>>,
}

impl RecordingClient {
    pub fn new(groups: HashMap<String, GroupMetadata>) -> Arc<Self> {
        Arc::new(Self {
            groups,
            fail_metadata: false,
            sent: Mutex::new(Vec::new()),
            read: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_metadata() -> Arc<Self> {
        Arc::new(Self {
            groups: HashMap::new(),
            fail_metadata: true,
            sent: Mutex::new(Vec::new()),
            read: Mutex::new(Vec::new()),
        })
    }

    /// Plain-text bodies of everything sent so far.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|(_, content)| match content {
                OutgoingContent::Text { text, .. } => Some(text.clone()),
                OutgoingContent::Delete { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatClient for RecordingClient {
    async fn fetch_group_metadata(&self, group_jid: &str) -> Result<GroupMetadata> {
        if self.fail_metadata {
            return Err(anyhow!("metadata fetch unavailable"));
        }
        self.groups
            .get(group_jid)
            .cloned()
            .ok_or_else(|| anyhow!("unknown group: {}", group_jid))
    }

    async fn send_message(&self, destination_jid: &str, content: OutgoingContent) -> Result<()> {
        self.sent
            .lock()
            .await
            .push((destination_jid.to_string(), content));
        Ok(())
    }

    async fn mark_read(&self, keys: &[MessageKey]) -> Result<()> {
        self.read.lock().await.extend_from_slice(keys);
        Ok(())
    }
}

pub const GROUP_JID: &str = "12036304@g.us";

pub fn user_jid(number: &str) -> String {
    format!("{}@s.whatsapp.net", number)
}

/// Group metadata with one participant per (number, role) pair.
pub fn group(subject: &str, locked: bool, members: &[(&str, ParticipantRole)]) -> GroupMetadata {
    GroupMetadata {
        subject: subject.to_string(),
        participants: members
            .iter()
            .map(|(number, role)| GroupParticipant {
                jid: user_jid(number),
                role: *role,
            })
            .collect(),
        locked,
    }
}

pub fn config() -> Config {
    Config {
        operating_number: "999".to_string(),
        owner_number: Some("500".to_string()),
        command_prefix: "!".to_string(),
        log_level: "debug".to_string(),
        ignore_self_messages: false,
    }
}

/// A text message from `number` in the shared test group.
pub fn group_text(id: &str, number: &str, text: &str) -> RawMessage {
    RawMessage {
        key: MessageKey {
            id: id.to_string(),
            remote_jid: GROUP_JID.to_string(),
            participant: Some(user_jid(number)),
            from_me: false,
        },
        push_name: Some("Tester".to_string()),
        timestamp: chrono::Utc::now().timestamp(),
        payload: Some(MessagePayload {
            conversation: Some(text.to_string()),
            ..Default::default()
        }),
    }
}

/// A direct (non-group) text message from `number`.
pub fn private_text(id: &str, number: &str, text: &str) -> RawMessage {
    RawMessage {
        key: MessageKey {
            id: id.to_string(),
            remote_jid: user_jid(number),
            participant: None,
            from_me: false,
        },
        push_name: Some("Tester".to_string()),
        timestamp: chrono::Utc::now().timestamp(),
        payload: Some(MessagePayload {
            conversation: Some(text.to_string()),
            ..Default::default()
        }),
    }
}

/// An image message with a caption, in the shared test group.
pub fn group_image(id: &str, number: &str, caption: Option<&str>) -> RawMessage {
    let mut raw = group_text(id, number, "");
    raw.payload = Some(MessagePayload {
        image: Some(MediaBody {
            caption: caption.map(String::from),
            mime_type: Some("image/jpeg".to_string()),
        }),
        ..Default::default()
    });
    raw
}

/// A message whose payload has no recognized kind.
pub fn unknown_payload(id: &str, number: &str) -> RawMessage {
    let mut raw = group_text(id, number, "");
    raw.payload = Some(MessagePayload::default());
    raw
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}
