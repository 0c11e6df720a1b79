use std::sync::Arc;

use chrono::{DateTime, Utc};
use gatekeeper_core::types::{CallerContext, RoleTag};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use tracing::warn;

use crate::error::{IdentityError, Result};
use crate::jwks::JwksCache;
use crate::revocation::RevocationCacheClient;

/// Claims carried by an IdP-issued bearer token. Field names match the
/// wire shape from spec §4.1 — `jti` is what the revocation set keys on.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    name: String,
    email: Option<String>,
    roles: Vec<String>,
    department: Option<String>,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Verifies bearer credentials against the configured IdP and produces a
/// [`CallerContext`] (spec §4.1). Owns the JWKS cache and a handle to the
/// revocation set; both are long-lived and shared across requests.
pub struct IdentityVerifier {
    jwks: Arc<JwksCache>,
    revocation: Arc<RevocationCacheClient>,
    issuer: String,
    audience: String,
}

impl IdentityVerifier {
    pub fn new(
        jwks: Arc<JwksCache>,
        revocation: Arc<RevocationCacheClient>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            jwks,
            revocation,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Runs the full verification sequence: parse header, resolve signing
    /// key (refreshing the JWKS cache exactly once on a miss or a bad
    /// signature), check issuer/audience/expiry, and consult the
    /// revocation set. Every failure path maps to `UNAUTHORIZED` at the
    /// caller, per spec §4.1 — the variant only matters for logs.
    pub async fn verify(&self, token: &str) -> Result<CallerContext> {
        let header = decode_header(token).map_err(|e| IdentityError::Malformed(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::Malformed("token header missing kid".into()))?;

        let claims = match self.decode_with_kid(token, &kid).await {
            Ok(claims) => claims,
            Err(IdentityError::UnknownKey(_)) | Err(IdentityError::BadSignature) => {
                // One refresh, then give up — spec §4.1 step 2.
                if let Err(e) = self.jwks.refresh().await {
                    warn!(error = %e, "jwks refresh failed during verification retry");
                }
                self.decode_with_kid(token, &kid).await?
            }
            Err(other) => return Err(other),
        };

        let now = Utc::now();
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(now);
        if expires_at <= now {
            return Err(IdentityError::Expired);
        }
        let issued_at = DateTime::from_timestamp(claims.iat, 0).unwrap_or(now);

        if self.revocation.is_revoked(&claims.jti) {
            return Err(IdentityError::Revoked);
        }

        let mut roles = Vec::with_capacity(claims.roles.len());
        for raw in &claims.roles {
            let tag = raw
                .parse::<RoleTag>()
                .map_err(|_| IdentityError::UnknownRole(raw.clone()))?;
            roles.push(tag);
        }

        Ok(CallerContext {
            user_id: claims.sub,
            display_name: claims.name,
            email: claims.email,
            roles,
            department: claims.department,
            issued_at,
            expires_at,
            token_id: claims.jti,
        })
    }

    async fn decode_with_kid(&self, token: &str, kid: &str) -> Result<Claims> {
        let key = self
            .jwks
            .get(kid)
            .ok_or_else(|| IdentityError::UnknownKey(kid.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => IdentityError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidAudience
                | jsonwebtoken::errors::ErrorKind::InvalidIssuer => IdentityError::WrongAudience,
                _ => IdentityError::BadSignature,
            })
    }
}
