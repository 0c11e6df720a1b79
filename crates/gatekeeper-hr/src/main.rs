use std::net::SocketAddr;
use std::sync::Arc;

use gatekeeper_core::config::ToolServerConfig;
use gatekeeper_hr::{router, schema, AppState, HrManager};
use gatekeeper_hr::db;
use rusqlite::Connection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper_hr=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("GATEKEEPER_HR_CONFIG").ok();
    let config = ToolServerConfig::load(config_path.as_deref(), "GATEKEEPER_HR_")?;

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| "gatekeeper-hr.sqlite3".to_string());
    let conn = Connection::open(&db_path)?;
    db::init_db(&conn)?;
    db::seed(&conn)?;

    let bind = config.bind.clone();
    let port = config.port;

    let state = Arc::new(AppState {
        manager: HrManager::new(conn),
        descriptors: schema::descriptors(),
        config,
    });

    let app = router::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(%addr, "gatekeeper hr tool server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
