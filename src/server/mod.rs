/// HTTP API server module
/// Serves the poller's snapshots as JSON and over a WebSocket

#[cfg(feature = "server")]
pub mod routes;

#[cfg(feature = "server")]
pub mod handlers;

#[cfg(feature = "server")]
pub mod websocket;

#[cfg(feature = "server")]
pub mod auth;

#[cfg(feature = "server")]
pub use routes::{create_router, AppState, ServerInfo};

#[cfg(feature = "server")]
pub async fn run(host: String, port: u16, enable_cors: bool, settings: crate::core::Settings) -> anyhow::Result<()> {
    use anyhow::Context;
    use std::net::SocketAddr;
    use tracing::{info, warn};

    use crate::core::poller;
    use crate::utils::{mask_sensitive, ENV_WEB_TOKEN};

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let web_token = std::env::var(ENV_WEB_TOKEN).ok();
    let (store, handle) = poller::start(&settings)?;
    let state = AppState::new(store, handle.control(), web_token, ServerInfo::from_settings(&settings));
    let masked_token = state.web_token.as_deref().map(|t| mask_sensitive(t, 4));

    let app = create_router(state, enable_cors);

    println!("dockmon API server");
    println!("   API:      http://{}/api", addr);
    println!("   Metrics:  {}", settings.api_base_url);
    if let Some(token) = masked_token {
        println!("   Auth:     Enabled for POST routes (token {})", token);
    } else {
        println!("   Auth:     Disabled (set {} to protect POST routes)", ENV_WEB_TOKEN);
        warn!("{} not set, refresh endpoint is unauthenticated", ENV_WEB_TOKEN);
    }

    println!();
    println!("API Endpoints:");
    println!("   GET  /api/health             - Health check");
    println!("   GET  /api/version            - Build and poller settings");
    println!("   GET  /api/snapshot           - Full current snapshot");
    println!("   GET  /api/containers         - Containers (?status=&instance=&sort=&direction=)");
    println!("   GET  /api/stats              - Container counts");
    println!("   GET  /api/metrics/:kind      - memory or cpu samples (?host=)");
    println!("   GET  /api/graph              - Host/container topology");
    println!("   POST /api/refresh            - Poll now");
    println!("   GET  /ws/snapshot            - WebSocket snapshot stream");
    println!();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    handle.stop().await;
    served?;

    Ok(())
}

#[cfg(feature = "server")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        // Without a signal handler, serve until the process is killed
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
