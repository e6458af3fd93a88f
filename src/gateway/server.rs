//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::dispatcher::GatewayDispatcher;
use super::router::create_router;
use crate::cache::{InMemoryTokenCache, TokenCache};
use crate::config::Config;
use crate::forward::HttpForwarder;
use crate::identity::KeystoneProvider;
use crate::{Error, Result};

/// Tenant gateway server
pub struct Gateway {
    config: Config,
    cache: Arc<InMemoryTokenCache>,
    dispatcher: Arc<GatewayDispatcher>,
}

impl Gateway {
    /// Create a gateway wired to the configured identity provider and backend
    pub fn new(config: Config) -> Result<Self> {
        let provider = Arc::new(KeystoneProvider::from_config(&config.identity)?);
        let forwarder = Arc::new(HttpForwarder::new()?);
        let cache = Arc::new(InMemoryTokenCache::new(config.cache.name.clone()));
        let shared_cache: Arc<dyn TokenCache> = cache.clone();

        let dispatcher = Arc::new(GatewayDispatcher::from_config(
            &config,
            provider,
            shared_cache,
            forwarder,
        )?);

        Ok(Self {
            config,
            cache,
            dispatcher,
        })
    }

    /// Run until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let (shutdown_tx, _) = broadcast::channel(1);

        let app = create_router(
            Arc::clone(&self.dispatcher),
            self.config.server.max_body_size,
        );
        let listener = TcpListener::bind(addr).await?;

        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(endpoint = %self.config.identity.endpoint, timeout = ?self.config.identity.timeout, "Identity provider");
        info!(endpoint = %self.config.backend.endpoint, timeout = ?self.config.backend.timeout, "Backend");
        info!(cache = %self.cache.name(), ttl = ?self.config.cache.ttl, "Token cache");
        if self.config.identity.url_replacement.is_empty() {
            warn!("identity.url_replacement is empty - writes are forwarded without tenant rewriting");
        }

        // Sweep expired tokens so memory tracks live entries only
        let cache = Arc::clone(&self.cache);
        let sweep_interval = self.config.cache.sweep_interval;
        let mut shutdown_rx = shutdown_tx.subscribe();
        let sweeper = tokio::spawn(async move {
            if sweep_interval.is_zero() {
                return;
            }
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        cache.evict_expired();
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown_tx))
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        let _ = sweeper.await;
        let stats = self.cache.stats();
        info!(hits = stats.hits, misses = stats.misses, evictions = stats.evictions, "Token cache at shutdown");

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
