//! The event loop tying the dispatch pipeline to the external client.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

use crate::client::{ChatClient, ClientEvent, ConnectionUpdate};
use crate::commands::{self, CommandRegistry};
use crate::config::Config;
use crate::cooldown::CooldownTracker;
use crate::executor::CommandExecutor;
use crate::permission::PermissionEvaluator;
use crate::router::MessageRouter;
use crate::scheduler::Scheduler;

/// The wired dispatch pipeline. Constructed once at startup around a
/// protocol client; no ambient global state.
pub struct App {
    pub config: Arc<Config>,
    pub registry: Arc<RwLock<CommandRegistry>>,
    pub cooldowns: Arc<CooldownTracker>,
    pub router: Arc<MessageRouter>,
}

impl App {
    /// Build the pipeline and load the built-in command manifest.
    pub async fn new(config: Config, client: Arc<dyn ChatClient>) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(RwLock::new(CommandRegistry::new()));
        let definitions = commands::manifest(Arc::clone(&registry));
        registry.write().await.load(definitions, false);

        let cooldowns = Arc::new(CooldownTracker::new());
        let evaluator = PermissionEvaluator::new(Arc::clone(&client), &config);
        let executor = Arc::new(CommandExecutor::new(
            Arc::clone(&registry),
            evaluator,
            Arc::clone(&cooldowns),
        ));
        let router = Arc::new(MessageRouter::new(
            client,
            executor,
            Arc::clone(&config),
        ));

        Self {
            config,
            registry,
            cooldowns,
            router,
        }
    }
}

/// Run the gateway loop until the event channel closes or the client reports
/// a terminal disconnect.
///
/// Messages delivered before the first `Open` update, or timestamped before
/// the latest connect, are dropped: protocol clients flush stale backlog
/// after inactivity. Every surviving message is dispatched on its own task,
/// so one slow or panicking dispatch never delays the rest.
pub async fn run(app: Arc<App>, mut events: mpsc::Receiver<ClientEvent>) -> Result<()> {
    let mut scheduler = Scheduler::with_cooldown_sweep(Arc::clone(&app.cooldowns)).await?;

    let mut connected_at_ms: Option<i64> = None;

    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::Connection(update) => match update {
                ConnectionUpdate::Connecting => info!("Connecting..."),
                ConnectionUpdate::Open => {
                    info!("Connected.");
                    connected_at_ms = Some(chrono::Utc::now().timestamp_millis());
                }
                ConnectionUpdate::Close {
                    reason,
                    should_reconnect,
                } => {
                    if should_reconnect {
                        warn!("Connection closed ({}); client will reconnect", reason);
                    } else {
                        error!("Connection closed ({}); not reconnecting", reason);
                        break;
                    }
                }
            },
            ClientEvent::Messages(batch) => {
                for raw in batch {
                    let fresh = connected_at_ms
                        .map(|connected_at| raw.timestamp * 1000 >= connected_at)
                        .unwrap_or(false);
                    if !fresh {
                        continue;
                    }

                    let router = Arc::clone(&app.router);
                    tokio::spawn(async move {
                        router.route(raw).await;
                    });
                }
            }
        }
    }

    scheduler.shutdown().await?;
    Ok(())
}
