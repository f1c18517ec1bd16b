//! PrayTell chat server
//!
//! Configuration comes from the file named by `CONFIG_FILE`, else the nearest
//! `config.toml`, else the environment (`WEAVIATE_HOST`, `OPENAI_API_KEY`).
//! A `.env` file in the working directory is loaded first.
//!
//! ```bash
//! curl -X POST http://localhost:3000/chat \
//!   -H "Content-Type: application/json" \
//!   -d '{"message":"What time is the service?","location":"New York, USA","datetime":"2024-01-01T09:00:00Z"}'
//! ```

use anyhow::{Context, Result};
use praytell_core::AppConfig;
use praytell_model::CompletionFactory;
use praytell_server::{AppState, create_router};
use praytell_store::StoreFactory;
use praytell_telemetry::init_telemetry;
use tracing::info;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_telemetry(&config.observability).context("Failed to initialize telemetry")?;

    let store =
        StoreFactory::from_config(&config.store).context("Failed to create context store")?;
    let completion = CompletionFactory::from_config(&config.model)
        .context("Failed to create completion engine")?;
    info!(store = store.name(), model = completion.name(), "Adapters ready");

    let state = AppState::from_config(&config, store, completion)?;
    let app = create_router(state);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(address = %address, "PrayTell server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}
