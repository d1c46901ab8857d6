use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use clinsight::core_state::CoreState;
use clinsight::{api, config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let runtime = config::RuntimeConfig::from_env();
    let core = Arc::new(CoreState::new(runtime.clone()));

    let mut server = match api::start_api_server(core, runtime.bind_addr).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start API server");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %server.addr, ai = %runtime.ai_base_url, "Clinsight API listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown requested");
    server.shutdown();
    server.join().await;
}
