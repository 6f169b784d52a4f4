//! Service wiring and process lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use keyward_core::{
    Disclosure, DocumentStore, EligibilityConfig, EngagementTracker, JsonDirStore, KeyStore,
    KeyStoreConfig, SpamConfig, SpamGuard, SqliteStore, UsageTracker,
};
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::commands::CommandRouter;
use crate::config::{BotConfig, StoreKind};
use crate::gateway::{self, ConsoleActions, ConsoleOutput};
use crate::http;
use crate::responder::AutoResponder;

/// Database file used by the SQLite backend, inside the data directory.
pub const SQLITE_FILE: &str = "keyward.db";

const SPAM_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Every stateful service, opened over one document store.
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub keys: Arc<KeyStore>,
    pub engagement: Arc<EngagementTracker>,
    pub usage: Arc<UsageTracker>,
    pub spam: Arc<SpamGuard>,
    pub disclosure: Arc<Disclosure>,
}

impl Services {
    /// Open the configured backend in the data directory.
    pub fn open(config: &BotConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store {
            StoreKind::Json => Arc::new(
                JsonDirStore::open(config.data_dir.clone())
                    .with_context(|| format!("failed to open {}", config.data_dir.display()))?,
            ),
            StoreKind::Sqlite => {
                std::fs::create_dir_all(&config.data_dir).with_context(|| {
                    format!("failed to create {}", config.data_dir.display())
                })?;
                let path = config.data_dir.join(SQLITE_FILE);
                Arc::new(
                    SqliteStore::open(&path)
                        .with_context(|| format!("failed to open {}", path.display()))?,
                )
            }
        };
        tracing::info!(store = %store.describe(), "state store opened");

        Ok(Self::with_store(
            store,
            config.keys,
            config.eligibility,
            config.spam,
            config.api_key.clone(),
        ))
    }

    pub fn with_store(
        store: Arc<dyn DocumentStore>,
        keys: KeyStoreConfig,
        eligibility: EligibilityConfig,
        spam: SpamConfig,
        api_key: Option<String>,
    ) -> Self {
        let keys = Arc::new(KeyStore::open(store.clone(), keys));
        let engagement = Arc::new(EngagementTracker::open(store.clone()));
        let usage = Arc::new(UsageTracker::open(store.clone()));
        let disclosure = Arc::new(Disclosure::new(
            keys.clone(),
            engagement.clone(),
            eligibility,
            api_key,
        ));
        Self {
            store,
            keys,
            engagement,
            usage,
            spam: Arc::new(SpamGuard::new(spam)),
            disclosure,
        }
    }

    /// Flush all state. Returns whether every write succeeded.
    pub fn close(&self) -> bool {
        let keys = self.keys.close();
        let engagement = self.engagement.close();
        let usage = self.usage.close();
        keys && engagement && usage
    }
}

/// Run the bot until ctrl-c.
///
/// The HTTP server and the console gateway run side by side. The gateway
/// ending (stdin closed) does not stop the process.
pub async fn run(config: BotConfig) -> anyhow::Result<()> {
    let services = Services::open(&config)?;
    let record = services.keys.current_or_rotate(Utc::now());
    tracing::info!(expires_at = %record.expires_at(), "key ready");

    let responder = match &config.responders {
        Some(path) => AutoResponder::load(path)?,
        None => AutoResponder::default(),
    };

    let output = Arc::new(ConsoleOutput::stdout());
    let actions = Arc::new(ConsoleActions::new(output.clone()));
    let router = Arc::new(CommandRouter::new(
        &services,
        responder,
        actions.clone(),
        actions,
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let app = http::router(http::AppState::new(services.disclosure.clone()));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(http::serve(listener, app, async move {
        let _ = stop_rx.await;
    }));

    let gateway = tokio::spawn(gateway::run(
        router,
        BufReader::new(tokio::io::stdin()),
        output,
    ));

    let sweeper = services.spam.config().is_enabled().then(|| {
        let spam = services.spam.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SPAM_SWEEP_INTERVAL);
            loop {
                tick.tick().await;
                spam.sweep(Utc::now());
            }
        })
    });

    tracing::info!(client_id = %config.client_id, port = config.port, "bot running");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");

    gateway.abort();
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    let _ = stop_tx.send(());
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }

    if !services.close() {
        tracing::warn!("some state could not be flushed on shutdown");
    }
    Ok(())
}
