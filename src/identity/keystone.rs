//! Keystone v2 token authentication
//!
//! Tokens are checked with `POST {endpoint}/tokens`:
//!
//! ```json
//! {"auth": {"token": {"id": "<token>"}, "tenantName": "<tenant>"}}
//! ```
//!
//! A 2xx answer carries `access.token.tenant.id`; 401 is a rejection. Other
//! statuses, transport failures and unparseable bodies are errors the verifier
//! must treat as a denial.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{Authentication, IdentityProvider};
use crate::config::IdentityConfig;
use crate::{Error, Result};

/// Header carrying the admin token on identity requests
const X_AUTH_TOKEN: &str = "X-Auth-Token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: AccessToken,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    #[serde(default)]
    tenant: Option<TenantRef>,
}

#[derive(Debug, Deserialize)]
struct TenantRef {
    #[serde(default)]
    id: Option<String>,
}

/// Keystone v2 identity provider client
pub struct KeystoneProvider {
    client: Client,
    tokens_url: String,
    admin_token: Option<String>,
}

impl KeystoneProvider {
    /// Build a provider from configuration
    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        Self::new(
            &config.endpoint,
            config.resolve_auth_token(),
            config.timeout,
            config.insecure,
        )
    }

    /// Create a provider for the identity API at `endpoint`
    ///
    /// `timeout` bounds each authenticate call; `insecure` disables TLS
    /// certificate verification.
    pub fn new(
        endpoint: &str,
        admin_token: Option<String>,
        timeout: Duration,
        insecure: bool,
    ) -> Result<Self> {
        if insecure {
            warn!(endpoint = %endpoint, "TLS certificate verification disabled for identity provider");
        }

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::Config(format!("identity client: {e}")))?;

        Ok(Self {
            client,
            tokens_url: format!("{}/tokens", endpoint.trim_end_matches('/')),
            admin_token,
        })
    }

    /// URL authenticate calls are posted to
    #[must_use]
    pub fn tokens_url(&self) -> &str {
        &self.tokens_url
    }
}

#[async_trait]
impl IdentityProvider for KeystoneProvider {
    async fn authenticate(&self, token: &str, tenant_name: &str) -> Result<Authentication> {
        let body = json!({
            "auth": {
                "token": { "id": token },
                "tenantName": tenant_name,
            }
        });

        let mut request = self.client.post(&self.tokens_url).json(&body);
        if let Some(ref admin) = self.admin_token {
            request = request.header(X_AUTH_TOKEN, admin);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            debug!(tenant = %tenant_name, "Identity provider rejected token");
            return Ok(Authentication::Unauthorized);
        }
        if !status.is_success() {
            return Err(Error::IdentityProvider(format!(
                "unexpected status {status} from {}",
                self.tokens_url
            )));
        }

        let body = response.bytes().await?;
        let parsed: TokenResponse = serde_json::from_slice(&body)?;

        Ok(Authentication::Accepted {
            tenant_id: parsed.access.token.tenant.and_then(|t| t.id),
        })
    }
}
