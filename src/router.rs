//! Normalizes raw protocol events into message contexts and forwards command
//! invocations to the executor.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::client::{is_group_jid, numeric_id, ChatClient, RawMessage};
use crate::config::Config;
use crate::executor::CommandExecutor;
use crate::message::{
    classify, display_text, parse_command, MessageContext, Origin, Sender,
};

/// Turns one raw inbound message into a dispatch, or drops it.
pub struct MessageRouter {
    client: Arc<dyn ChatClient>,
    executor: Arc<CommandExecutor>,
    config: Arc<Config>,
}

impl MessageRouter {
    pub fn new(
        client: Arc<dyn ChatClient>,
        executor: Arc<CommandExecutor>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            client,
            executor,
            config,
        }
    }

    /// Process a single raw message event. Messages without an addressable
    /// origin, without a payload, or of an unrecognized kind are discarded.
    pub async fn route(&self, raw: RawMessage) {
        if raw.key.remote_jid.is_empty() {
            return;
        }
        let Some(payload) = raw.payload.as_ref() else {
            return;
        };
        let Some(kind) = classify(payload) else {
            debug!("Discarding message {} of unknown kind", raw.key.id);
            return;
        };

        let is_group = is_group_jid(&raw.key.remote_jid);
        let sender_jid = if is_group {
            match raw.key.participant.as_deref() {
                Some(participant) => participant.to_string(),
                // A group message without a sender has no addressable origin.
                None => return,
            }
        } else {
            raw.key.remote_jid.clone()
        };
        let number = numeric_id(&sender_jid).to_string();

        if self.config.ignore_self_messages && number == self.config.operating_number {
            debug!("Ignoring self message {}", raw.key.id);
            return;
        }

        // Group metadata is best-effort; dispatch continues without it.
        let mut group_name = None;
        let mut locked = false;
        if is_group {
            match self.client.fetch_group_metadata(&raw.key.remote_jid).await {
                Ok(metadata) => {
                    group_name = Some(metadata.subject);
                    locked = metadata.locked;
                }
                Err(e) => error!(
                    "Failed to fetch group metadata for {}: {:#}",
                    raw.key.remote_jid, e
                ),
            }
        }

        // Locked groups are announce-only; nothing in them is dispatched.
        if locked {
            debug!(
                "Ignoring message in locked group {:?} ({})",
                group_name, raw.key.remote_jid
            );
            return;
        }

        let text = display_text(kind, payload).unwrap_or_default();
        let trimmed = text.trim().to_string();
        let parsed = parse_command(&trimmed, &self.config.command_prefix);
        let quoted = payload
            .extended_text
            .as_ref()
            .and_then(|t| t.quoted.clone());

        let origin_jid = if is_group {
            raw.key.remote_jid.clone()
        } else {
            sender_jid.clone()
        };

        let ctx = MessageContext {
            message_id: raw.key.id.clone(),
            raw_key: raw.key.clone(),
            kind,
            text: text.clone(),
            trimmed_text: trimmed,
            timestamp: raw.timestamp,
            sender: Sender {
                display_name: raw.push_name.clone().unwrap_or_default(),
                number: number.clone(),
                jid: sender_jid,
            },
            origin: Origin {
                jid: origin_jid,
                is_group,
                group_name: group_name.clone(),
                locked,
            },
            parsed_command: parsed,
            quoted,
            client: Arc::clone(&self.client),
            prefix: self.config.command_prefix.clone(),
        };

        debug!(
            "[#{}] @{}: {}",
            group_name.as_deref().unwrap_or("private"),
            number,
            text
        );

        // Read receipt is best-effort and must not block dispatch.
        {
            let client = Arc::clone(&self.client);
            let keys = vec![ctx.raw_key.clone()];
            tokio::spawn(async move {
                if let Err(e) = client.mark_read(&keys).await {
                    warn!("Failed to mark message read: {:#}", e);
                }
            });
        }

        if ctx.parsed_command.is_some() {
            self.executor.execute(&ctx).await;
        }
    }
}
