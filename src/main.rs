use std::process;
use std::sync::Arc;

// used to serve the dashboard api
use tokio::net::TcpListener;
// used for structured logging
use tracing::{error, info};

use ldmview::config::Settings;
use ldmview::server::{router, AppState};
use ldmview::{LdmError, Result};

async fn run() -> Result<()> {
    let settings = Settings::load()?;
    info!(
        upstream = %settings.upstream_base_url,
        repository = %settings.default_repository,
        bind = %settings.bind_address,
        "starting ldmview"
    );
    let listener = TcpListener::bind(&settings.bind_address)
        .await
        .map_err(|e| LdmError::Config(format!("bind {}: {e}", settings.bind_address)))?;
    let state = Arc::new(AppState::new(settings)?);
    axum::serve(listener, router(state))
        .await
        .map_err(|e| LdmError::Transport(e.to_string()))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ldmview=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "ldmview stopped");
        process::exit(1);
    }
}
