use std::net::SocketAddr;
use std::sync::Arc;

use gatekeeper_core::config::ToolServerConfig;
use gatekeeper_finance::db;
use gatekeeper_finance::{router, schema, AppState, FinanceManager};
use rusqlite::Connection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper_finance=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("GATEKEEPER_FINANCE_CONFIG").ok();
    let config = ToolServerConfig::load(config_path.as_deref(), "GATEKEEPER_FINANCE_")?;

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| "gatekeeper-finance.sqlite3".to_string());
    let conn = Connection::open(&db_path)?;
    db::init_db(&conn)?;
    db::seed(&conn)?;

    let bind = config.bind.clone();
    let port = config.port;

    let state = Arc::new(AppState {
        manager: FinanceManager::new(conn),
        descriptors: schema::descriptors(),
        config,
    });

    let app = router::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(%addr, "gatekeeper finance tool server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
