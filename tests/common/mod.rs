//! Test doubles for the identity provider and the backend

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tenant_gateway::cache::{InMemoryTokenCache, TokenCache};
use tenant_gateway::config::Config;
use tenant_gateway::forward::{BackendResponse, ForwardMethod, Forwarder};
use tenant_gateway::gateway::GatewayDispatcher;
use tenant_gateway::identity::{Authentication, IdentityProvider};
use tenant_gateway::{Error, Result};

pub const BACKEND: &str = "http://es.test:9200/";

/// Scripted provider answer for one token
#[derive(Debug, Clone)]
pub enum Reply {
    Accept(&'static str),
    AcceptWithoutTenant,
    Reject,
    Fail,
}

/// Identity provider answering from a script and recording every call
#[derive(Default)]
pub struct StubProvider {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, token: &str, reply: Reply) -> Self {
        self.set(token, reply);
        self
    }

    pub fn set(&self, token: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(token.to_string(), reply);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn authenticate(&self, token: &str, tenant_name: &str) -> Result<Authentication> {
        self.calls
            .lock()
            .unwrap()
            .push((token.to_string(), tenant_name.to_string()));

        let reply = self.replies.lock().unwrap().get(token).cloned();
        match reply {
            Some(Reply::Accept(tenant_id)) => Ok(Authentication::Accepted {
                tenant_id: Some(tenant_id.to_string()),
            }),
            Some(Reply::AcceptWithoutTenant) => Ok(Authentication::Accepted { tenant_id: None }),
            Some(Reply::Fail) => Err(Error::IdentityProvider("provider unavailable".to_string())),
            Some(Reply::Reject) | None => Ok(Authentication::Unauthorized),
        }
    }
}

/// A request the backend double received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub method: ForwardMethod,
    pub url: String,
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

/// Backend double returning a fixed response, or failing when `down`
pub struct StubBackend {
    status: StatusCode,
    body: &'static str,
    down: bool,
    sent: Mutex<Vec<Sent>>,
    hits: AtomicUsize,
}

impl StubBackend {
    pub fn ok(body: &'static str) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    pub fn with_status(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            body,
            down: false,
            sent: Mutex::new(Vec::new()),
            hits: AtomicUsize::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            down: true,
            ..Self::ok("")
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forwarder for StubBackend {
    async fn send(
        &self,
        method: ForwardMethod,
        url: &str,
        body: Option<Bytes>,
        timeout: Duration,
    ) -> Result<BackendResponse> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(Sent {
            method,
            url: url.to_string(),
            body,
            timeout,
        });

        if self.down {
            return Err(Error::Transport("connection refused".to_string()));
        }
        Ok(BackendResponse {
            status: self.status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from_static(self.body.as_bytes()),
        })
    }
}

/// Configuration pointing at the test backend, rewriting `_all`
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.backend.endpoint = BACKEND.to_string();
    config.backend.timeout = Duration::from_secs(2);
    config.identity.url_replacement = "_all".to_string();
    config
}

/// Everything a dispatcher test needs to inspect
pub struct Harness {
    pub provider: Arc<StubProvider>,
    pub backend: Arc<StubBackend>,
    pub cache: Arc<InMemoryTokenCache>,
    pub dispatcher: Arc<GatewayDispatcher>,
}

pub fn harness(config: &Config, provider: StubProvider, backend: StubBackend) -> Harness {
    let provider = Arc::new(provider);
    let backend = Arc::new(backend);
    let cache = Arc::new(InMemoryTokenCache::new("test-tokens"));

    let shared_cache: Arc<dyn TokenCache> = cache.clone();
    let dispatcher = Arc::new(GatewayDispatcher::from_config(
        config,
        provider.clone(),
        shared_cache,
        backend.clone(),
    )
    .expect("dispatcher"));

    Harness {
        provider,
        backend,
        cache,
        dispatcher,
    }
}
