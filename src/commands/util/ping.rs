use anyhow::Result;
use async_trait::async_trait;

use crate::commands::{Command, CooldownSpec};
use crate::cooldown::CooldownScope;
use crate::message::MessageContext;
use crate::permission::Permission;

/// Liveness check.
pub struct Ping;

#[async_trait]
impl Command for Ping {
    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> &str {
        "Replies with Pong! to confirm the bot is responding"
    }

    fn category(&self) -> &str {
        "Utility"
    }

    fn access_level(&self) -> Permission {
        Permission::RegularUser
    }

    fn cooldown(&self) -> CooldownSpec {
        CooldownSpec {
            scope: CooldownScope::PerUserPerCommand,
            length_secs: 5,
        }
    }

    async fn run(&self, ctx: &MessageContext) -> Result<()> {
        ctx.send_to_origin("Pong!").await;
        Ok(())
    }
}
