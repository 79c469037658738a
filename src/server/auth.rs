//! Inbound bearer-key verification.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::error::ProxyError;

/// Verifies `Authorization: Bearer <key>` against the configured key.
#[derive(Clone)]
pub struct BearerAuth {
    expected_key: String,
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").finish_non_exhaustive()
    }
}

impl BearerAuth {
    pub fn new(expected_key: impl Into<String>) -> Self {
        Self {
            expected_key: expected_key.into(),
        }
    }

    /// Check a raw header value. The whole token must match exactly.
    pub fn verify(&self, header: Option<&str>) -> Result<(), ProxyError> {
        let token = header
            .and_then(|h| h.trim().strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(ProxyError::Unauthorized)?;

        if token.as_bytes().ct_eq(self.expected_key.as_bytes()).into() {
            Ok(())
        } else {
            Err(ProxyError::Unauthorized)
        }
    }

    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<(), ProxyError> {
        let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        self.verify(header)
    }
}
