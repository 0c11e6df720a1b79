use axum::http::StatusCode;
use axum::Json;
use governor::DefaultKeyedRateLimiter;
use serde_json::{json, Value};

/// Checks a keyed token bucket for `key` (spec §4.1 "Rate limiting").
/// Exceeding it returns `429` with a retry-after hint and never reaches a
/// `/query` stream — callers must run this before opening one.
pub fn check(limiter: &DefaultKeyedRateLimiter<String>, key: &str) -> Result<(), (StatusCode, Json<Value>)> {
    match limiter.check_key(&key.to_string()) {
        Ok(()) => Ok(()),
        Err(not_until) => {
            let retry_after_secs = not_until.wait_time_from(governor::clock::DefaultClock::default().now()).as_secs();
            Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "code": "RATE_LIMITED",
                    "message": "rate limit exceeded",
                    "retryAfterSecs": retry_after_secs,
                })),
            ))
        }
    }
}
