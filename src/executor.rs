//! The dispatch pipeline for parsed commands: resolve, authorize, rate-limit,
//! validate usage, invoke.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::commands::CommandRegistry;
use crate::cooldown::CooldownTracker;
use crate::message::MessageContext;
use crate::permission::{has_permission, Permission, PermissionEvaluator};

/// Orchestrates one command execution per inbound command message.
pub struct CommandExecutor {
    registry: Arc<RwLock<CommandRegistry>>,
    permissions: PermissionEvaluator,
    cooldowns: Arc<CooldownTracker>,
}

impl CommandExecutor {
    pub fn new(
        registry: Arc<RwLock<CommandRegistry>>,
        permissions: PermissionEvaluator,
        cooldowns: Arc<CooldownTracker>,
    ) -> Self {
        Self {
            registry,
            permissions,
            cooldowns,
        }
    }

    /// Run the pipeline for a context whose `parsed_command` is set. Every
    /// failing step returns without a user-visible error except usage
    /// validation, which replies with the expected usage string.
    pub async fn execute(&self, ctx: &MessageContext) {
        let Some(parsed) = ctx.parsed_command.as_ref() else {
            return;
        };

        // Unknown and disabled commands are ignored without a reply, so their
        // existence is not revealed.
        let command = { self.registry.read().await.resolve(&parsed.name) };
        let Some(command) = command else {
            return;
        };
        if !command.enabled() {
            return;
        }
        let name = command.name();

        let user_permissions = self.permissions.evaluate(ctx).await;

        let required = command.access_level();
        if !has_permission(&user_permissions, required) {
            debug!(
                "Access denied for \"{}\" - user: {}, group: {:?}, needs: {:?}, has: {:?}",
                name, ctx.sender.number, ctx.origin.group_name, required, user_permissions
            );
            return;
        }

        // Bot owners bypass cooldowns entirely, both check and apply.
        let bypasses_cooldowns = has_permission(&user_permissions, Permission::BotOwner);
        let cooldown = command.cooldown();

        if !bypasses_cooldowns {
            let statuses = self.cooldowns.check_any(name, ctx).await;
            if let Some((scope, status)) = statuses.iter().find(|(_, s)| s.on_cooldown) {
                debug!(
                    "Cooldown enforced for \"{}\" - scope: {:?}, remaining: {}ms, user: {}, group: {:?}",
                    name, scope, status.remaining_ms, ctx.sender.number, ctx.origin.group_name
                );
                return;
            }

            self.cooldowns
                .add(
                    ctx,
                    cooldown.scope,
                    cooldown.length_secs as i64 * 1000,
                    Some(name),
                )
                .await;
        }

        if let Some(usage) = command.usage() {
            let expected = usage.split_whitespace().count();
            if parsed.args.len() < expected {
                // The attempt doesn't count against the rate limit.
                self.cooldowns.remove(ctx, cooldown.scope, Some(name)).await;
                ctx.reply_usage(usage).await;
                return;
            }
        }

        let started = Instant::now();
        match command.run(ctx).await {
            Ok(()) => debug!("Executed \"{}\" in {:?}", name, started.elapsed()),
            Err(e) => error!(
                "Command \"{}\" failed - user: {}, origin: {}: {:#}",
                name, ctx.sender.number, ctx.origin.jid, e
            ),
        }
    }
}
