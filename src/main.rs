use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use fastgpt_proxy::config::{Cli, Config};
use fastgpt_proxy::server::openai_api::{build_router, AppState};
use fastgpt_proxy::upstream::KagiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "fastgpt_proxy=debug,tower_http=debug"
    } else {
        "fastgpt_proxy=info,tower_http=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }

    info!("fastgpt-proxy v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Arc::new(Config::from_cli(&cli)?);

    info!(
        upstream = config.upstream.base_url,
        timeout_secs = config.upstream.timeout_secs,
        model = config.stream.model,
        chunk_size = config.stream.chunk_size,
        "Configuration loaded"
    );

    // Initialize the upstream client.
    let upstream = Arc::new(KagiClient::from_config(&config.upstream)?);

    // Build application state and router.
    let state = Arc::new(AppState::new(config.clone(), upstream));
    let app = build_router(state);

    // Start the server.
    let listen_addr = config.server.listen.clone();
    info!(addr = listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
