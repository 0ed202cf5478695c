use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::{AUTH_FAILURES, RATE_LIMITED, REQUEST_TOTAL};
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

// Credential that passed the shared-secret check
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential(pub String);

impl Credential {
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

// Short digest prefix so logs never carry the raw key
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Static shared-secret check against the configured API key.
pub struct Authenticator {
    secret_digest: [u8; 32],
}

impl Authenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            secret_digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    // Exact match, compared on fixed-length digests
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        candidate
            .iter()
            .zip(self.secret_digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Credential, AppError> {
        let presented = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Forbidden)?;

        if self.matches(presented) {
            Ok(Credential(presented.to_string()))
        } else {
            Err(AppError::Forbidden)
        }
    }
}

// Route layer: authenticate, then charge the credential's rate window
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    REQUEST_TOTAL.inc();
    let credential = state.authenticator.authenticate(req.headers()).inspect_err(|_| {
        AUTH_FAILURES.inc();
    })?;

    if !state.rate_limiter.check_and_record(&credential.0) {
        RATE_LIMITED.inc();
        tracing::warn!(key = %credential.fingerprint(), "rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    req.extensions_mut().insert(credential);
    Ok(next.run(req).await)
}
