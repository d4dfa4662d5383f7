//! Permission levels and the per-message evaluator.
//!
//! Levels form a strict hierarchy (BotOwner over GroupOwner over GroupAdmin
//! over RegularUser) expressed as an explicit closure table; `SelfOperator`
//! sits outside the hierarchy entirely.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::client::{ChatClient, ParticipantRole};
use crate::config::Config;
use crate::message::MessageContext;

/// User permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Anyone without a more specific level.
    RegularUser,
    /// Admin of the originating group.
    GroupAdmin,
    /// Creator or current owner of the originating group.
    GroupOwner,
    /// The configured bot owner. Bypasses cooldowns.
    BotOwner,
    /// The bot's own operating account. Not part of the hierarchy.
    SelfOperator,
}

impl Permission {
    /// Levels implied by holding this one.
    fn implies(self) -> &'static [Permission] {
        match self {
            Permission::BotOwner => &[
                Permission::GroupOwner,
                Permission::GroupAdmin,
                Permission::RegularUser,
            ],
            Permission::GroupOwner => &[Permission::GroupAdmin, Permission::RegularUser],
            Permission::GroupAdmin => &[Permission::RegularUser],
            Permission::RegularUser | Permission::SelfOperator => &[],
        }
    }
}

/// The set of levels a user holds for one dispatch. Computed per message,
/// never persisted.
pub type PermissionSet = HashSet<Permission>;

/// Whether `set` satisfies `required`, directly or through the hierarchy.
pub fn has_permission(set: &PermissionSet, required: Permission) -> bool {
    set.iter()
        .any(|level| *level == required || level.implies().contains(&required))
}

/// Computes a user's permission set for a message context.
pub struct PermissionEvaluator {
    client: Arc<dyn ChatClient>,
    owner_number: Option<String>,
    operating_number: String,
}

impl PermissionEvaluator {
    pub fn new(client: Arc<dyn ChatClient>, config: &Config) -> Self {
        Self {
            client,
            owner_number: config.owner_number.clone(),
            operating_number: config.operating_number.clone(),
        }
    }

    /// Evaluate the sender's permissions. Group metadata failures degrade to
    /// "no group-derived permissions" rather than aborting dispatch.
    pub async fn evaluate(&self, ctx: &MessageContext) -> PermissionSet {
        let mut permissions = PermissionSet::new();

        if ctx.origin.is_group {
            match self.client.fetch_group_metadata(&ctx.origin.jid).await {
                Ok(metadata) => {
                    match metadata
                        .participants
                        .iter()
                        .find(|p| p.jid == ctx.sender.jid)
                    {
                        Some(participant) => match participant.role {
                            ParticipantRole::Superadmin => {
                                permissions.insert(Permission::GroupOwner);
                            }
                            ParticipantRole::Admin => {
                                permissions.insert(Permission::GroupAdmin);
                            }
                            ParticipantRole::Member => {}
                        },
                        None => warn!(
                            "Couldn't load user info: \"{}\" in group \"{}\"",
                            ctx.sender.jid, ctx.origin.jid
                        ),
                    }
                }
                Err(e) => warn!(
                    "Failed to fetch group metadata for {}: {:#}",
                    ctx.origin.jid, e
                ),
            }
        }

        if self.owner_number.as_deref() == Some(ctx.sender.number.as_str()) {
            permissions.insert(Permission::BotOwner);
        }

        // Default level, unless something more specific applied above.
        if permissions.is_empty() {
            permissions.insert(Permission::RegularUser);
        }

        if ctx.sender.number == self.operating_number {
            permissions.insert(Permission::SelfOperator);
        }

        permissions
    }
}
