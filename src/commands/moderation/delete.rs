use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::client::OutgoingContent;
use crate::commands::{Command, CooldownSpec};
use crate::cooldown::CooldownScope;
use crate::message::MessageContext;
use crate::permission::Permission;

/// Deletes the quoted message. Invoked as a reply to the target.
pub struct Delete;

#[async_trait]
impl Command for Delete {
    fn name(&self) -> &str {
        "delete"
    }

    fn aliases(&self) -> &[&str] {
        &["del"]
    }

    fn description(&self) -> &str {
        "Deletes the message this command replies to"
    }

    fn category(&self) -> &str {
        "Moderation"
    }

    fn access_level(&self) -> Permission {
        Permission::GroupAdmin
    }

    fn cooldown(&self) -> CooldownSpec {
        CooldownSpec {
            scope: CooldownScope::PerUserPerCommand,
            length_secs: 3,
        }
    }

    async fn run(&self, ctx: &MessageContext) -> Result<()> {
        let Some(target) = ctx.quoted.clone() else {
            ctx.reply_in_origin("Reply to the message you want deleted.")
                .await;
            return Ok(());
        };

        ctx.client()
            .send_message(&ctx.origin.jid, OutgoingContent::Delete { key: target })
            .await
            .context("Failed to delete message")?;
        Ok(())
    }
}
