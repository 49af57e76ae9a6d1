// Mobile-money SMS ledger - Web Server

use anyhow::{Context, Result};
use momo_ledger::api::{router, AppState};
use momo_ledger::{init_tracing, AppConfig, TransactionStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config.log_level);

    info!("Mobile-money SMS ledger - Web Server v{}", momo_ledger::VERSION);

    let store = TransactionStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    info!(path = %config.database_path.display(), "database ready");

    let addr = config.bind_address();
    let app = router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("API: http://{}/api/transactions", addr);

    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}
