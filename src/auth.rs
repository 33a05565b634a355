//! Admin gate for client record routes.
//!
//! The gate yields allow/deny only; anything that is not a clear allow
//! (missing header, wrong token, no token configured) is a deny.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use sha2::{Digest, Sha256};

use crate::error::{Result, RouterError};

pub trait AuthGate: Send + Sync {
    fn is_authorized(&self, headers: &HeaderMap) -> bool;

    fn require(&self, headers: &HeaderMap) -> Result<()> {
        if self.is_authorized(headers) {
            Ok(())
        } else {
            Err(RouterError::Unauthorized)
        }
    }
}

/// SHA-256 digest of a secret; comparisons do not short-circuit.
#[derive(Clone)]
pub struct SecretDigest([u8; 32]);

impl SecretDigest {
    pub fn new(secret: &str) -> Self {
        Self(Sha256::digest(secret.as_bytes()).into())
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let other: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        self.0
            .iter()
            .zip(other.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// `Authorization: Bearer <token>` against a single configured admin token.
pub struct BearerTokenGate {
    token: Option<SecretDigest>,
}

impl BearerTokenGate {
    pub fn new(token: Option<&str>) -> Self {
        let token = token.filter(|t| !t.is_empty()).map(SecretDigest::new);
        if token.is_none() {
            tracing::warn!(target: "auth", "no admin token configured; admin routes will deny all requests");
        }
        Self { token }
    }
}

impl AuthGate for BearerTokenGate {
    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.token else {
            return false;
        };
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|t| expected.matches(t.trim()))
    }
}
