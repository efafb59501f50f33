// ABOUTME: Entry point for the poold binary.
// ABOUTME: Initializes tracing, loads config, rebuilds the ledger, and starts the HTTP server.

use std::sync::Arc;

use poold_bot::DiscordRest;
use poold_core::Ledger;
use poold_server::{AppState, PooldConfig, create_router};
use poold_store::SheetsStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poold=debug,tower_http=debug".parse().unwrap()),
        )
        .init();

    tracing::info!("poold starting up");

    let config = PooldConfig::from_env()?;

    let store = Arc::new(SheetsStore::new(
        config.credentials.clone(),
        config.sheet_id.clone(),
        config.sheet_tab.clone(),
    ));
    let ledger = Arc::new(Ledger::new(store));

    let report = ledger.rebuild().await?;
    if report.stranded.is_empty() {
        tracing::info!(accounts = report.total, "ledger ready");
    } else {
        tracing::warn!(
            accounts = report.total,
            stranded = report.stranded.len(),
            "ledger ready; some rows are still marked borrowed from a previous run"
        );
    }

    let rest = DiscordRest::new(config.bot_token.clone());
    let state = Arc::new(AppState::new(
        ledger,
        rest,
        config.public_key,
        config.application_id.clone(),
    ));

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %config.bind, "poold listening");
    axum::serve(listener, app).await?;

    Ok(())
}
