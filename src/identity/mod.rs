//! Identity provider access and token verification
//!
//! [`IdentityProvider`] is the single capability the gateway needs from the
//! outside world: "is this token good for this tenant, and which tenant id
//! does it map to?". [`KeystoneProvider`] answers it against a Keystone v2
//! token API; [`IdentityVerifier`] puts the token cache in front of it.

mod keystone;
mod verifier;

pub use keystone::KeystoneProvider;
pub use verifier::{IdentityVerifier, Verification};

use async_trait::async_trait;

use crate::Result;

/// Result of a completed authenticate call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// The provider accepted the token for the claimed tenant
    Accepted {
        /// Canonical tenant id, if the provider returned one
        tenant_id: Option<String>,
    },
    /// The provider explicitly rejected the token
    Unauthorized,
}

/// External identity provider
///
/// `Err` means the call could not produce a clean accept or reject (network
/// error, timeout, unexpected status, malformed body). Callers must treat it
/// as a denial.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate `token` against the claimed `tenant_name`
    async fn authenticate(&self, token: &str, tenant_name: &str) -> Result<Authentication>;
}

/// Short, stable fingerprint of a token for log records.
///
/// Raw tokens are bearer credentials and never go into logs.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    use sha2::{Digest, Sha256};

    Sha256::digest(token.as_bytes())
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}
