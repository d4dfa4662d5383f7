use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::commands::{Command, CommandRegistry, CooldownSpec};
use crate::cooldown::CooldownScope;
use crate::message::MessageContext;
use crate::permission::Permission;

/// Lists the available commands, grouped by category.
pub struct Help {
    registry: Arc<RwLock<CommandRegistry>>,
}

impl Help {
    pub fn new(registry: Arc<RwLock<CommandRegistry>>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Command for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn aliases(&self) -> &[&str] {
        &["commands"]
    }

    fn description(&self) -> &str {
        "Lists available commands"
    }

    fn category(&self) -> &str {
        "Utility"
    }

    fn access_level(&self) -> Permission {
        Permission::RegularUser
    }

    fn cooldown(&self) -> CooldownSpec {
        CooldownSpec {
            scope: CooldownScope::PerUser,
            length_secs: 10,
        }
    }

    async fn run(&self, ctx: &MessageContext) -> Result<()> {
        let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
        {
            let registry = self.registry.read().await;
            for command in registry.list() {
                if !command.enabled() {
                    continue;
                }
                by_category
                    .entry(command.category().to_string())
                    .or_default()
                    .push(format!(
                        "  {}{} - {}",
                        ctx.prefix,
                        command.name(),
                        command.description()
                    ));
            }
        }

        let mut listing = String::from("Available commands:\n");
        for (category, mut lines) in by_category {
            lines.sort();
            listing.push_str(&format!("\n{}:\n", category));
            listing.push_str(&lines.join("\n"));
            listing.push('\n');
        }

        ctx.send_to_origin(listing).await;
        Ok(())
    }
}
