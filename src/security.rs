use crate::errors::AppError;
use axum::http::HeaderMap;
use base64::Engine;
use governor::{DefaultDirectRateLimiter, DefaultKeyedRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::{num::NonZeroU32, sync::Arc};

/// Returns the presented credential: a bearer token, or the password half of
/// HTTP Basic credentials so a plain browser prompt can log in.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let auth = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;
    if let Some(token) = auth.strip_prefix("Bearer ") {
        return Some(token.to_string());
    }
    let encoded = auth.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let pair = String::from_utf8(decoded).ok()?;
    let (_user, password) = pair.split_once(':')?;
    Some(password.to_string())
}

pub fn require_credential(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let presented = extract_credential(headers).ok_or(AppError::Unauthorized)?;
    if presented != expected {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Guards state-changing requests against cross-site form posts. An empty
/// allow-list turns the check off.
pub fn check_origin(headers: &HeaderMap, allowed: &[String]) -> Result<(), AppError> {
    if allowed.is_empty() {
        return Ok(());
    }
    let origin = headers
        .get("Origin")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::OriginDenied)?;
    if allowed.iter().any(|o| o == origin) {
        Ok(())
    } else {
        Err(AppError::OriginDenied)
    }
}

pub fn content_length_ok(headers: &HeaderMap, max_kb: usize) -> Result<(), AppError> {
    if let Some(len) = headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
    {
        if len > max_kb * 1024 {
            return Err(AppError::RequestTooLarge);
        }
    }
    Ok(())
}

/// Global limiter plus one limiter per presented credential.
#[derive(Clone)]
pub struct RateLimiters {
    global: Arc<DefaultDirectRateLimiter>,
    per_credential: Arc<DefaultKeyedRateLimiter<String>>,
}

impl RateLimiters {
    pub fn new(per_credential_rps: u32, per_credential_burst: u32, global_rps: u32, global_burst: u32) -> Self {
        Self {
            global: Arc::new(RateLimiter::direct(quota(global_rps, global_burst))),
            per_credential: Arc::new(RateLimiter::keyed(quota(per_credential_rps, per_credential_burst))),
        }
    }

    pub fn check(&self, credential: Option<&str>) -> Result<(), AppError> {
        self.global.check().map_err(|_| AppError::RateLimited)?;
        let key = credential.unwrap_or("anonymous").to_string();
        self.per_credential.check_key(&key).map_err(|_| AppError::RateLimited)
    }
}

fn quota(rps: u32, burst: u32) -> Quota {
    let rps = NonZeroU32::new(rps).unwrap_or(nonzero!(1u32));
    let burst = NonZeroU32::new(burst).unwrap_or(rps);
    Quota::per_second(rps).allow_burst(burst)
}
