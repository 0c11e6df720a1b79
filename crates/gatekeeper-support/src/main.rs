use std::net::SocketAddr;
use std::sync::Arc;

use gatekeeper_core::config::ToolServerConfig;
use gatekeeper_support::{router, schema, AppState, TicketIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper_support=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("GATEKEEPER_SUPPORT_CONFIG").ok();
    let config = ToolServerConfig::load(config_path.as_deref(), "GATEKEEPER_SUPPORT_")?;

    let bind = config.bind.clone();
    let port = config.port;

    let state = Arc::new(AppState {
        store: TicketIndex::seeded(),
        descriptors: schema::descriptors(),
        config,
    });

    let app = router::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(%addr, "gatekeeper support tool server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
