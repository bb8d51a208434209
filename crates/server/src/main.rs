use clap::Parser;
use tracing::info;

use tiergate_server::cli::ServerArgs;
use tiergate_server::{build_router, startup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = ServerArgs::parse();
    tiergate_core::config::load_dotenv();
    let mut config = tiergate_core::Config::from_env();
    args.apply(&mut config);
    config.validate()?;
    config.log_summary();

    let routing = startup::load_routing(&config)?;
    let addr = config.server.bind_addr();
    let state = startup::build_app_state(config, routing, None);
    let background = startup::spawn_background(&state);
    let scheduler = state.scheduler.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    scheduler.shutdown();
    background.scheduler.await?;
    background.mitigation.abort();
    Ok(())
}
