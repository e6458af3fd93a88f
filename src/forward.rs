//! Request forwarding to the search backend

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use tracing::debug;

use crate::{Error, Result};

/// Methods the gateway forwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMethod {
    /// Read, no body
    Get,
    /// Write, carries the inbound body
    Post,
}

impl ForwardMethod {
    /// Upper-case method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Backend answer, relayed to the caller untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    /// Status code returned by the backend
    pub status: StatusCode,
    /// Backend `Content-Type`, if any
    pub content_type: Option<String>,
    /// Raw response body
    pub body: Bytes,
}

/// Outbound capability for reaching the backend
///
/// `Err` covers connection failures, timeouts and protocol errors. Any HTTP
/// status the backend actually returns is an `Ok` response.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Send one request and wait at most `timeout` for the full response
    async fn send(
        &self,
        method: ForwardMethod,
        url: &str,
        body: Option<Bytes>,
        timeout: Duration,
    ) -> Result<BackendResponse>;
}

/// `reqwest`-backed forwarder with a pooled client
pub struct HttpForwarder {
    client: Client,
}

impl HttpForwarder {
    /// Create a forwarder. Per-request timeouts are passed to [`Forwarder::send`].
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn send(
        &self,
        method: ForwardMethod,
        url: &str,
        body: Option<Bytes>,
        timeout: Duration,
    ) -> Result<BackendResponse> {
        let request = match method {
            ForwardMethod::Get => self.client.get(url),
            ForwardMethod::Post => self.client.post(url).body(body.unwrap_or_default()),
        };

        let response = request
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::from_backend(&e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::from_backend(&e))?;

        debug!(method = method.as_str(), url = %url, status = %status, bytes = body.len(), "Backend responded");

        Ok(BackendResponse {
            status,
            content_type,
            body,
        })
    }
}
