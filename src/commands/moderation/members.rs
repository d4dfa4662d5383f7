use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::client::{numeric_id, ParticipantRole};
use crate::commands::{Command, CooldownSpec};
use crate::cooldown::CooldownScope;
use crate::message::MessageContext;
use crate::permission::Permission;

/// Lists the members of the originating group, marking admins.
pub struct Members;

#[async_trait]
impl Command for Members {
    fn name(&self) -> &str {
        "members"
    }

    fn aliases(&self) -> &[&str] {
        &["getmembers"]
    }

    fn description(&self) -> &str {
        "Lists the members of this group"
    }

    fn category(&self) -> &str {
        "Moderation"
    }

    fn access_level(&self) -> Permission {
        Permission::GroupAdmin
    }

    fn cooldown(&self) -> CooldownSpec {
        CooldownSpec {
            scope: CooldownScope::PerCommandGlobal,
            length_secs: 30,
        }
    }

    async fn run(&self, ctx: &MessageContext) -> Result<()> {
        if !ctx.origin.is_group {
            ctx.send_to_origin("This command only works in groups.").await;
            return Ok(());
        }

        let metadata = ctx
            .client()
            .fetch_group_metadata(&ctx.origin.jid)
            .await
            .context("Failed to fetch group metadata")?;

        let mut listing = format!("Members in this group ({}):\n", metadata.participants.len());
        for participant in &metadata.participants {
            let marker = match participant.role {
                ParticipantRole::Superadmin => " - Super Admin",
                ParticipantRole::Admin => " - Admin",
                ParticipantRole::Member => "",
            };
            listing.push_str(&format!("{}{}\n", numeric_id(&participant.jid), marker));
        }

        ctx.send_to_origin(listing).await;
        Ok(())
    }
}
