//! Cache-fronted token verification

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::{Authentication, IdentityProvider, token_fingerprint};
use crate::cache::TokenCache;

/// Verdict for one `(token, tenant_name)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Token is trusted and maps to `tenant_id`
    Verified {
        /// Tenant id resolved by the provider (possibly earlier, via the cache)
        tenant_id: String,
    },
    /// Provider rejected the token
    Rejected,
    /// Provider could not give a clean answer; access is denied
    Failed,
}

impl Verification {
    /// Whether the request may proceed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// Resolved tenant id, present only for a valid verdict
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            Self::Verified { tenant_id } => Some(tenant_id),
            Self::Rejected | Self::Failed => None,
        }
    }
}

/// Verifies tokens, consulting the cache before the identity provider
///
/// The cache is keyed by token alone. A token verified under one claimed
/// tenant name is therefore accepted for any other claimed name until its
/// entry expires, and keeps resolving to the tenant id first returned.
pub struct IdentityVerifier {
    provider: Arc<dyn IdentityProvider>,
    cache: Arc<dyn TokenCache>,
    ttl: Duration,
}

impl IdentityVerifier {
    /// Create a verifier caching successful verifications for `ttl`
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        cache: Arc<dyn TokenCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            ttl,
        }
    }

    /// Verify `token` for the claimed `tenant_name`
    pub async fn verify(&self, token: &str, tenant_name: &str) -> Verification {
        let fingerprint = token_fingerprint(token);

        if let Some(tenant_id) = self.cache.get(token) {
            debug!(token = %fingerprint, tenant_id = %tenant_id, "Token served from cache");
            return Verification::Verified { tenant_id };
        }

        match self.provider.authenticate(token, tenant_name).await {
            Ok(Authentication::Accepted {
                tenant_id: Some(tenant_id),
            }) => {
                self.cache.put(token, &tenant_id, self.ttl);
                debug!(token = %fingerprint, tenant = %tenant_name, tenant_id = %tenant_id, "Token verified");
                Verification::Verified { tenant_id }
            }
            Ok(Authentication::Accepted { tenant_id: None }) => {
                // Without a tenant id the request cannot be scoped
                warn!(token = %fingerprint, tenant = %tenant_name, "Identity provider accepted token without a tenant id");
                Verification::Failed
            }
            Ok(Authentication::Unauthorized) => {
                debug!(token = %fingerprint, tenant = %tenant_name, "Token rejected");
                Verification::Rejected
            }
            Err(e) => {
                error!(token = %fingerprint, tenant = %tenant_name, error = %e, "Token verification failed, denying");
                Verification::Failed
            }
        }
    }
}
