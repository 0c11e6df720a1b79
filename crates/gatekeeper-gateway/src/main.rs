use std::net::SocketAddr;
use std::sync::Arc;

use gatekeeper_core::config::GatewayConfig;
use gatekeeper_identity::{IdentityVerifier, JwksCache, RevocationCacheClient};
use gatekeeper_llm::AnthropicProvider;
use tracing::info;

mod auth;
mod discovery;
mod http;
mod ratelimit;
mod router;
mod state;
mod system_prompt;
mod tool_client;
mod tool_executor;

use state::GatewayState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper_gateway=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("GATEKEEPER_CONFIG").ok();
    let config = GatewayConfig::load(config_path.as_deref())?;

    let http = reqwest::Client::new();
    let jwks = Arc::new(JwksCache::new(config.idp.jwks_url.clone(), http.clone()));
    jwks.refresh().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "initial JWKS fetch failed, will retry on first verification miss");
    });

    let revocation = Arc::new(RevocationCacheClient::new(
        config.redis_url.clone().unwrap_or_default(),
        config.revocation.fail_open,
    ));
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    {
        let revocation = revocation.clone();
        let interval = config.revocation.sync_interval_secs;
        tokio::spawn(async move { revocation.run(interval, shutdown_rx).await });
    }

    let verifier = IdentityVerifier::new(jwks, revocation.clone(), config.idp.issuer.clone(), config.idp.audience.clone());

    let tools = discovery::discover_all(&http, &config.tool_servers).await;
    info!(count = tools.len(), "tool discovery complete");

    let llm = AnthropicProvider::new(config.llm.api_key.clone(), config.llm.base_url.clone());

    let bind = config.bind.clone();
    let port = config.port;

    let state = Arc::new(GatewayState::new(config, verifier, revocation, llm, tools));
    let app = router::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!(%addr, "gatekeeper gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
