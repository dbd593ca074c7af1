// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald serve`: wire the store, engine and gateway, then run until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use herald_config::HeraldConfig;
use herald_core::HeraldError;
use herald_engine::NotificationService;
use herald_gateway::{GatewayState, WsTransport, server::verifier_from_config, start_server};
use herald_storage::SqliteStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::shutdown;

/// How often expired SQLite rows are swept in the background.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Workspace crates whose events the default filter enables.
const CRATE_TARGETS: &[&str] = &[
    "herald",
    "herald_core",
    "herald_config",
    "herald_storage",
    "herald_engine",
    "herald_gateway",
];

pub async fn run_serve(config: HeraldConfig) -> Result<(), HeraldError> {
    init_tracing(&config.log.level);
    info!(version = env!("CARGO_PKG_VERSION"), "herald serve starting");

    let store = herald_storage::open_store(&config.storage).await?;
    let transport = WsTransport::new();
    let service = Arc::new(NotificationService::new(
        store.durable(),
        Arc::new(transport.clone()),
        &config,
    ));
    let state = GatewayState::new(
        service.clone(),
        transport,
        verifier_from_config(&config.auth),
    );

    let cancel = shutdown::install_signal_handler();
    let purge = store
        .sqlite()
        .cloned()
        .map(|sqlite| spawn_purge(sqlite, cancel.clone()));

    let result = start_server(&config.server, state, cancel.clone()).await;

    cancel.cancel();
    if let Some(task) = purge {
        if let Err(e) = task.await {
            warn!(error = %e, "purge task ended abnormally");
        }
    }
    service.shutdown().await;
    info!("herald serve shutdown complete");
    result
}

/// Periodically delete expired rows so the database does not grow with
/// keys nobody reads again.
fn spawn_purge(sqlite: Arc<SqliteStore>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match sqlite.purge_all_expired().await {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "purged expired keys"),
                    Err(e) => warn!(error = %e, "expired key purge failed"),
                },
            }
        }
    })
}

/// Default filter directives: `level` for every workspace crate, `warn`
/// for everything else.
fn default_filter(level: &str) -> String {
    let mut directives: Vec<String> = CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides `log.level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
