use std::net::SocketAddr;
use std::sync::Arc;

use gatekeeper_core::config::ToolServerConfig;
use gatekeeper_sales::{router, schema, AppState, DealStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper_sales=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("GATEKEEPER_SALES_CONFIG").ok();
    let config = ToolServerConfig::load(config_path.as_deref(), "GATEKEEPER_SALES_")?;

    let bind = config.bind.clone();
    let port = config.port;

    let state = Arc::new(AppState {
        store: DealStore::seeded(),
        descriptors: schema::descriptors(),
        config,
    });

    let app = router::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(%addr, "gatekeeper sales tool server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
