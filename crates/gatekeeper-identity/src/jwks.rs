use std::collections::HashMap;
use std::sync::RwLock;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use tracing::{debug, warn};

use crate::error::{IdentityError, Result};

/// Fetches and caches the IdP's public signing keys (JWKS). A verification
/// failure triggers at most one refresh before the token is declared
/// invalid (spec §4.1 step 2) — callers drive that policy via
/// [`JwksCache::refresh`]; this type only owns the cache itself.
pub struct JwksCache {
    jwks_url: String,
    http: reqwest::Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl JwksCache {
    pub fn new(jwks_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            http,
            keys: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, kid: &str) -> Option<DecodingKey> {
        self.keys.read().unwrap().get(kid).cloned()
    }

    /// Re-fetch the full key set and replace the cache atomically (a single
    /// write-lock swap, not per-key mutation).
    pub async fn refresh(&self) -> Result<()> {
        let resp = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| IdentityError::JwksFetch(e.to_string()))?;

        let jwk_set: JwkSet = resp
            .json()
            .await
            .map_err(|e| IdentityError::JwksFetch(e.to_string()))?;

        let mut fresh = HashMap::new();
        for jwk in &jwk_set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    fresh.insert(kid, key);
                }
                Err(e) => warn!(kid, error = %e, "skipping unparseable JWK"),
            }
        }

        debug!(count = fresh.len(), "refreshed JWKS cache");
        *self.keys.write().unwrap() = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kid_misses_cache() {
        let cache = JwksCache::new("https://idp.example/jwks", reqwest::Client::new());
        assert!(cache.get("no-such-kid").is_none());
    }
}
