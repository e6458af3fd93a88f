//! Tenant Gateway Library
//!
//! Authenticating reverse proxy for a multi-tenant search backend.
//!
//! # Request flow
//!
//! - **GET**: forwarded without tenant scoping, unless the path matches the
//!   configured forbidden pattern (bulk search by default), which is refused.
//! - **POST**: requires `X-Auth-Token` and `X-Tenant-Name`. The token is
//!   verified against the identity provider (or the token cache), the URL is
//!   rewritten into the resolved tenant's partition, and the body forwarded.
//!
//! Backend responses are relayed byte-for-byte. Verification failures of any
//! kind deny access.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod forward;
pub mod gateway;
pub mod identity;
pub mod rewrite;

pub use error::{Error, Result};

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::Layered, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Setup tracing/logging
///
/// Records go to stdout when `console` is set and are appended to `logfile`
/// when one is configured. `RUST_LOG` overrides `verbosity`.
pub fn setup_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.verbosity));
    let json = logging.format.as_deref() == Some("json");

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if logging.console {
        layers.push(if json {
            fmt::layer().json().boxed()
        } else {
            fmt::layer().boxed()
        });
    }

    if let Some(ref path) = logging.logfile {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = Mutex::new(file);
        layers.push(if json {
            fmt::layer().json().with_writer(writer).boxed()
        } else {
            fmt::layer().with_ansi(false).with_writer(writer).boxed()
        });
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()
        .map_err(|e| Error::Internal(format!("tracing already initialised: {e}")))?;

    Ok(())
}
