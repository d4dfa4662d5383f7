//! Command definitions and the name/alias registry.

pub mod moderation;
pub mod util;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::cooldown::CooldownScope;
use crate::message::MessageContext;
use crate::permission::Permission;

/// Cooldown configuration of a command.
#[derive(Debug, Clone, Copy)]
pub struct CooldownSpec {
    pub scope: CooldownScope,
    pub length_secs: u64,
}

/// A named, permission-gated, rate-limited bot action.
///
/// Metadata accessors carry the defaults; implementations override what they
/// need and provide the async handler.
#[async_trait]
pub trait Command: Send + Sync {
    /// Unique key users type after the command prefix. Lowercase, one token.
    fn name(&self) -> &str;

    /// Additional names resolving to this command.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    fn description(&self) -> &str;

    fn category(&self) -> &str {
        "Uncategorized"
    }

    /// Argument template enforced before execution, e.g. `<user> <reason>`.
    /// Invocations with fewer arguments than template tokens get a usage
    /// reply instead of execution.
    fn usage(&self) -> Option<&str> {
        None
    }

    /// Minimum permission level required to execute.
    fn access_level(&self) -> Permission;

    fn cooldown(&self) -> CooldownSpec {
        CooldownSpec {
            scope: CooldownScope::PerUserPerCommand,
            length_secs: 3,
        }
    }

    /// Disabled commands stay registered but never execute.
    fn enabled(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &MessageContext) -> Result<()>;
}

/// Registry of commands, indexed by name with alias indirection.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Load a set of definitions, validating each. A definition failing
    /// validation is skipped and logged without aborting the rest. With
    /// `purge_existing`, the registry is cleared first (hot-reload).
    pub fn load(&mut self, definitions: Vec<Arc<dyn Command>>, purge_existing: bool) {
        if purge_existing {
            self.commands.clear();
            self.aliases.clear();
        }

        info!("Initializing commands...");

        for command in definitions {
            if let Err(e) = validate(command.as_ref()) {
                error!("Failed to load command \"{}\": {:#}", command.name(), e);
                continue;
            }
            self.add(command);
        }

        info!("Registered {} commands.", self.commands.len());
    }

    fn add(&mut self, command: Arc<dyn Command>) {
        let name = command.name().to_string();
        if self.commands.contains_key(&name) || self.aliases.contains_key(&name) {
            error!(
                "Command name collision: \"{}\" is already registered; keeping the earlier definition",
                name
            );
            return;
        }

        for alias in command.aliases() {
            if self.commands.contains_key(*alias) || self.aliases.contains_key(*alias) {
                error!(
                    "Alias collision: \"{}\" (for command \"{}\") is already taken; keeping the earlier binding",
                    alias, name
                );
                continue;
            }
            self.aliases.insert(alias.to_string(), name.clone());
        }

        self.commands.insert(name, command);
    }

    /// Direct name lookup, falling back to alias indirection.
    pub fn resolve(&self, name_or_alias: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name_or_alias).cloned().or_else(|| {
            self.aliases
                .get(name_or_alias)
                .and_then(|name| self.commands.get(name).cloned())
        })
    }

    /// All registered commands.
    pub fn list(&self) -> Vec<Arc<dyn Command>> {
        self.commands.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(command: &dyn Command) -> Result<()> {
    let name = command.name();
    if name.is_empty() {
        bail!("command has an empty name");
    }
    if name.split_whitespace().count() != 1 || name != name.to_lowercase() {
        bail!("command name must be a single lowercase token");
    }
    if command.description().is_empty() {
        bail!("command has an empty description");
    }
    for alias in command.aliases() {
        if alias.is_empty() || alias.split_whitespace().count() != 1 {
            bail!("alias \"{}\" must be a single non-empty token", alias);
        }
    }
    Ok(())
}

/// Built-in command manifest. Discovery is an explicit list so the
/// registered set is statically known; add new commands here.
pub fn manifest(registry: Arc<RwLock<CommandRegistry>>) -> Vec<Arc<dyn Command>> {
    vec![
        Arc::new(util::ping::Ping),
        Arc::new(util::help::Help::new(registry)),
        Arc::new(util::debug::Debug),
        Arc::new(moderation::members::Members),
        Arc::new(moderation::delete::Delete),
    ]
}
