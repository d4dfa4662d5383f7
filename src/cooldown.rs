//! Per-scope command rate limits with lazy expiry.
//!
//! Entries live in process memory only and reset on restart. Expired entries
//! are dropped on the read path; a periodic sweep reclaims the rest.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::message::MessageContext;

/// Rate-limit scopes. All scopes are namespaced by the originating
/// conversation, so the same user has independent cooldowns in different
/// groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownScope {
    /// One entry per user, shared across commands.
    PerUser,
    /// One entry per command, shared across users.
    PerCommandGlobal,
    /// One entry per user and command.
    PerUserPerCommand,
}

impl CooldownScope {
    pub const ALL: [CooldownScope; 3] = [
        CooldownScope::PerUser,
        CooldownScope::PerCommandGlobal,
        CooldownScope::PerUserPerCommand,
    ];
}

/// Composite key namespacing one cooldown entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScopeKey {
    scope: CooldownScope,
    origin: String,
    user: Option<String>,
    command: Option<String>,
}

impl ScopeKey {
    /// Derive the key for a scope from a message context.
    ///
    /// Panics if `command_name` is missing for a scope that requires it;
    /// that is a programming error at the call site, not a runtime
    /// condition.
    fn derive(scope: CooldownScope, ctx: &MessageContext, command_name: Option<&str>) -> Self {
        let origin = ctx.origin.jid.clone();
        let command = || {
            command_name
                .map(String::from)
                .unwrap_or_else(|| panic!("cooldown scope {:?} requires a command name", scope))
        };
        match scope {
            CooldownScope::PerUser => Self {
                scope,
                origin,
                user: Some(ctx.sender.number.clone()),
                command: None,
            },
            CooldownScope::PerCommandGlobal => Self {
                scope,
                origin,
                user: None,
                command: Some(command()),
            },
            CooldownScope::PerUserPerCommand => Self {
                scope,
                origin,
                user: Some(ctx.sender.number.clone()),
                command: Some(command()),
            },
        }
    }
}

/// Result of a cooldown lookup for one scope.
#[derive(Debug, Clone, Copy)]
pub struct CooldownStatus {
    pub on_cooldown: bool,
    /// Time left in the window; zero when not on cooldown.
    pub remaining_ms: i64,
}

/// Tracks active cooldown entries, keyed by scope. Shared by concurrent
/// dispatch tasks; each operation is atomic under the lock. Check and apply
/// are separate calls, so two dispatches racing the same key can both pass
/// the check before either applies.
pub struct CooldownTracker {
    entries: Mutex<HashMap<ScopeKey, i64>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Apply a cooldown of `duration_ms` for the given scope, overwriting any
    /// existing entry for the same key.
    pub async fn add(
        &self,
        ctx: &MessageContext,
        scope: CooldownScope,
        duration_ms: i64,
        command_name: Option<&str>,
    ) {
        let key = ScopeKey::derive(scope, ctx, command_name);
        let expires_at = Self::now_ms() + duration_ms;
        self.entries.lock().await.insert(key, expires_at);
    }

    /// Look up all three scopes for a command. Expired entries encountered on
    /// the way are purged and reported as not on cooldown.
    pub async fn check_any(
        &self,
        command_name: &str,
        ctx: &MessageContext,
    ) -> HashMap<CooldownScope, CooldownStatus> {
        let now = Self::now_ms();
        let mut entries = self.entries.lock().await;
        let mut statuses = HashMap::new();

        for scope in CooldownScope::ALL {
            let key = ScopeKey::derive(scope, ctx, Some(command_name));
            let status = match entries.get(&key) {
                Some(&expires_at) if expires_at > now => CooldownStatus {
                    on_cooldown: true,
                    remaining_ms: expires_at - now,
                },
                Some(_) => {
                    entries.remove(&key);
                    CooldownStatus {
                        on_cooldown: false,
                        remaining_ms: 0,
                    }
                }
                None => CooldownStatus {
                    on_cooldown: false,
                    remaining_ms: 0,
                },
            };
            statuses.insert(scope, status);
        }

        statuses
    }

    /// Drop the entry for a scope, if present. Idempotent.
    pub async fn remove(
        &self,
        ctx: &MessageContext,
        scope: CooldownScope,
        command_name: Option<&str>,
    ) {
        let key = ScopeKey::derive(scope, ctx, command_name);
        self.entries.lock().await.remove(&key);
    }

    /// Drop every expired entry, returning how many were removed. Invoked by
    /// the background sweep so keys that are never re-read don't accumulate.
    pub async fn purge_expired(&self) -> usize {
        let now = Self::now_ms();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}
