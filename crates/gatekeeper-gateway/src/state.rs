use std::sync::Arc;

use dashmap::DashMap;
use gatekeeper_contract::ToolDescriptor;
use gatekeeper_core::config::GatewayConfig;
use gatekeeper_identity::{IdentityVerifier, JwksCache, RevocationCacheClient};
use gatekeeper_llm::AnthropicProvider;
use gatekeeper_pending::{InMemoryPendingStore, PendingActionStore, RedisPendingStore};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

/// Central shared state, mirroring the reference workspace's
/// `AppState` — passed as `Arc<GatewayState>` to every axum handler.
pub struct GatewayState {
    pub config: GatewayConfig,
    pub verifier: IdentityVerifier,
    pub revocation: Arc<RevocationCacheClient>,
    pub http: reqwest::Client,
    pub llm: AnthropicProvider,
    pub pending_store: Arc<dyn PendingActionStore>,
    /// Registered tool descriptors, populated at startup by polling every
    /// configured Tool Server's `/tools/discover` (spec §3 "ToolDescriptor").
    pub tools: Vec<ToolDescriptor>,
    pub general_limiter: DefaultKeyedRateLimiter<String>,
    pub query_limiter: DefaultKeyedRateLimiter<String>,
    /// In-flight `/query` cancellation tokens, keyed by correlation id —
    /// mirrors the reference workspace's `active_operations` map, used so
    /// a client disconnect can abort an in-progress tool loop.
    pub active_queries: DashMap<String, tokio_util::sync::CancellationToken>,
}

impl GatewayState {
    pub fn new(
        config: GatewayConfig,
        verifier: IdentityVerifier,
        revocation: Arc<RevocationCacheClient>,
        llm: AnthropicProvider,
        tools: Vec<ToolDescriptor>,
    ) -> Self {
        let pending_store: Arc<dyn PendingActionStore> = match &config.redis_url {
            Some(url) => match RedisPendingStore::new(url) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::warn!(error = %e, "falling back to in-memory pending store");
                    Arc::new(InMemoryPendingStore::new())
                }
            },
            None => Arc::new(InMemoryPendingStore::new()),
        };

        let general_quota = Quota::per_minute(
            NonZeroU32::new(config.rate.general_per_min).unwrap_or(NonZeroU32::new(100).unwrap()),
        );
        let query_quota = Quota::per_minute(
            NonZeroU32::new(config.rate.query_per_min).unwrap_or(NonZeroU32::new(10).unwrap()),
        );

        Self {
            config,
            verifier,
            revocation,
            http: reqwest::Client::new(),
            llm,
            pending_store,
            tools,
            general_limiter: RateLimiter::keyed(general_quota),
            query_limiter: RateLimiter::keyed(query_quota),
            active_queries: DashMap::new(),
        }
    }

    pub fn jwks_cache(http: reqwest::Client, jwks_url: &str) -> JwksCache {
        JwksCache::new(jwks_url, http)
    }
}
