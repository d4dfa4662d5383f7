use anyhow::Result;
use async_trait::async_trait;

use crate::commands::Command;
use crate::message::MessageContext;
use crate::permission::Permission;

/// Dumps the normalized view of the triggering message. Owner-only.
pub struct Debug;

#[async_trait]
impl Command for Debug {
    fn name(&self) -> &str {
        "debug"
    }

    fn description(&self) -> &str {
        "Shows how the bot parsed this message"
    }

    fn category(&self) -> &str {
        "Utility"
    }

    fn access_level(&self) -> Permission {
        Permission::BotOwner
    }

    async fn run(&self, ctx: &MessageContext) -> Result<()> {
        let args = ctx
            .parsed_command
            .as_ref()
            .map(|c| c.args.join(" "))
            .unwrap_or_default();

        let report = format!(
            "Message {}\nkind: {:?}\nfrom: {} ({})\norigin: {}{}\nargs: [{}]",
            ctx.message_id,
            ctx.kind,
            ctx.sender.display_name,
            ctx.sender.number,
            ctx.origin.jid,
            ctx.origin
                .group_name
                .as_deref()
                .map(|name| format!(" ({})", name))
                .unwrap_or_default(),
            args,
        );

        ctx.reply_in_origin(report).await;
        Ok(())
    }
}
