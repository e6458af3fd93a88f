//! Per-request policy
//!
//! Reads (GET) are forwarded unscoped unless their path hits the forbidden
//! pattern. Writes (POST) must carry a token and a tenant name, are verified,
//! and are rewritten into the verified tenant's partition before forwarding.
//!
//! Every request ends in exactly one [`Outcome`]; no error escapes to the
//! HTTP layer and nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::cache::TokenCache;
use crate::config::Config;
use crate::forward::{BackendResponse, ForwardMethod, Forwarder};
use crate::identity::{IdentityProvider, IdentityVerifier, token_fingerprint};
use crate::rewrite::UrlRewriter;
use crate::Result;

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Read path matched the forbidden pattern
    ForbiddenReadPath,
    /// Write lacked a token or tenant name
    MissingCredentials,
    /// Token rejected, or the provider could not vouch for it
    InvalidToken,
}

/// Terminal state of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Refused before reaching the backend
    Unauthorized(RejectReason),
    /// Backend answered; relay as-is
    Forwarded(BackendResponse),
    /// Backend unreachable or failed at transport level
    ForwardFailed,
}

/// Credentials presented on a write
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    /// Bearer token
    pub token: Option<&'a str>,
    /// Tenant name the caller claims
    pub tenant_name: Option<&'a str>,
}

/// Stateless orchestrator shared by every in-flight request
pub struct GatewayDispatcher {
    verifier: IdentityVerifier,
    rewriter: UrlRewriter,
    forwarder: Arc<dyn Forwarder>,
    backend_timeout: Duration,
    /// Lower-cased; empty disables the check
    forbidden_read_pattern: String,
}

impl GatewayDispatcher {
    /// Assemble a dispatcher from its collaborators
    pub fn new(
        verifier: IdentityVerifier,
        rewriter: UrlRewriter,
        forwarder: Arc<dyn Forwarder>,
        backend_timeout: Duration,
        forbidden_read_pattern: &str,
    ) -> Self {
        Self {
            verifier,
            rewriter,
            forwarder,
            backend_timeout,
            forbidden_read_pattern: forbidden_read_pattern.to_lowercase(),
        }
    }

    /// Assemble a dispatcher using the settings in `config`
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn IdentityProvider>,
        cache: Arc<dyn TokenCache>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Result<Self> {
        Ok(Self::new(
            IdentityVerifier::new(provider, cache, config.cache.ttl),
            UrlRewriter::new(&config.backend.endpoint, config.identity.url_replacement.clone())?,
            forwarder,
            config.backend.timeout,
            &config.backend.forbidden_read_pattern,
        ))
    }

    /// Handle a GET for the percent-decoded `path` (no leading slash)
    pub async fn handle_read(&self, path: &str, query: Option<&str>) -> Outcome {
        if self.is_forbidden_read(path) {
            warn!(path = %path, "Refusing unauthenticated read of forbidden path");
            return Outcome::Unauthorized(RejectReason::ForbiddenReadPath);
        }

        let url = with_query(self.rewriter.build_url(path, None), query);
        self.forward(ForwardMethod::Get, &url, None).await
    }

    /// Handle a POST for the percent-decoded `path` (no leading slash)
    pub async fn handle_write(
        &self,
        path: &str,
        query: Option<&str>,
        credentials: Credentials<'_>,
        body: Bytes,
    ) -> Outcome {
        let (Some(token), Some(tenant_name)) = (
            credentials.token.filter(|t| !t.is_empty()),
            credentials.tenant_name.filter(|t| !t.is_empty()),
        ) else {
            debug!(path = %path, "Write without token or tenant name");
            return Outcome::Unauthorized(RejectReason::MissingCredentials);
        };

        let verification = self.verifier.verify(token, tenant_name).await;
        let Some(tenant_id) = verification.tenant_id() else {
            warn!(path = %path, tenant = %tenant_name, token = %token_fingerprint(token), "Write refused");
            return Outcome::Unauthorized(RejectReason::InvalidToken);
        };

        let url = with_query(self.rewriter.build_url(path, Some(tenant_id)), query);
        self.forward(ForwardMethod::Post, &url, Some(body)).await
    }

    fn is_forbidden_read(&self, path: &str) -> bool {
        !self.forbidden_read_pattern.is_empty()
            && path.to_lowercase().contains(&self.forbidden_read_pattern)
    }

    async fn forward(&self, method: ForwardMethod, url: &str, body: Option<Bytes>) -> Outcome {
        match self
            .forwarder
            .send(method, url, body, self.backend_timeout)
            .await
        {
            Ok(response) => Outcome::Forwarded(response),
            Err(e) => {
                error!(method = method.as_str(), url = %url, error = %e, timeout = e.is_timeout(), "Forwarding failed");
                Outcome::ForwardFailed
            }
        }
    }
}

fn with_query(mut url: String, query: Option<&str>) -> String {
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(q);
    }
    url
}
