//! Heritrail web server
//!
//! Run with: cargo run -p heritrail-web

use heritrail_config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("heritrail=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load()?;
    let bind = config.server.bind.clone();

    let state = heritrail_web::state::AppState::from_config(config)?;
    let app = heritrail_web::router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Heritrail listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
