//! Configuration management
//!
//! Settings are read once at startup from an optional YAML file, overlaid with
//! `TENANT_GATEWAY_`-prefixed environment variables (`__` separates sections,
//! e.g. `TENANT_GATEWAY_CACHE__TTL=600`), and then frozen for the lifetime of
//! the process.

use std::{env, path::Path, path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "TENANT_GATEWAY_";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inbound listener configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Identity provider configuration
    pub identity: IdentityConfig,
    /// Token cache configuration
    pub cache: CacheConfig,
    /// Search backend configuration
    pub backend: BackendConfig,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or fails [`Config::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that serde alone cannot reject
    pub fn validate(&self) -> Result<()> {
        parse_endpoint("identity.endpoint", &self.identity.endpoint)?;
        parse_endpoint("backend.endpoint", &self.backend.endpoint)?;

        if self.identity.timeout.is_zero() {
            return Err(Error::Config("identity.timeout must be non-zero".to_string()));
        }
        if self.backend.timeout.is_zero() {
            return Err(Error::Config("backend.timeout must be non-zero".to_string()));
        }
        if self.cache.ttl.is_zero() {
            return Err(Error::Config("cache.ttl must be non-zero".to_string()));
        }
        if self.cache.name.is_empty() {
            return Err(Error::Config("cache.name must not be empty".to_string()));
        }
        if let Some(var_name) = self
            .identity
            .auth_token
            .as_deref()
            .and_then(|t| t.strip_prefix("env:"))
            && env::var(var_name).is_err()
        {
            return Err(Error::Config(format!(
                "identity.auth_token: environment variable {var_name} is not set"
            )));
        }
        Ok(())
    }

    /// Copy of this configuration safe to print (admin token masked)
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.identity.auth_token.is_some() {
            config.identity.auth_token = Some("***".to_string());
        }
        config
    }
}

fn parse_endpoint(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| Error::Config(format!("{field}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "{field}: unsupported scheme '{other}'"
        ))),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write log records to stdout
    pub console: bool,
    /// Append log records to this file as well
    pub logfile: Option<PathBuf>,
    /// Level filter (trace, debug, info, warn, error)
    pub verbosity: String,
    /// Record format (text, json)
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console: true,
            logfile: None,
            verbosity: "warn".to_string(),
            format: None,
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Identity API base URL; tokens are authenticated at `{endpoint}/tokens`
    pub endpoint: String,
    /// Admin token presented to the identity provider.
    /// Supports a literal value or `env:VAR_NAME`.
    pub auth_token: Option<String>,
    /// Timeout for a single authenticate call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Skip TLS certificate verification. Use with caution.
    pub insecure: bool,
    /// Path segment replaced by the resolved tenant id (e.g. `_all`).
    /// Empty leaves write paths untouched.
    pub url_replacement: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:35357/v2.0".to_string(),
            auth_token: None,
            timeout: Duration::from_secs(5),
            insecure: false,
            url_replacement: String::new(),
        }
    }
}

impl IdentityConfig {
    /// Resolve the admin token (expand `env:` references)
    ///
    /// An `env:` reference to an unset variable resolves to `None`;
    /// [`Config::validate`] refuses such a configuration.
    #[must_use]
    pub fn resolve_auth_token(&self) -> Option<String> {
        let token = self.auth_token.as_ref()?;
        match token.strip_prefix("env:") {
            Some(var_name) => env::var(var_name).ok(),
            None => Some(token.clone()),
        }
    }
}

/// Token cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache name, used to label log records and stats
    pub name: String,
    /// How long a verified token stays trusted
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// How often expired entries are swept from memory
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "cache-token".to_string(),
            ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Search backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL every forwarded path is appended to
    pub endpoint: String,
    /// Timeout for a single forwarded request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Unauthenticated GETs whose path contains this (case-insensitive) are refused.
    /// Empty disables the check.
    pub forbidden_read_pattern: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200/".to_string(),
            timeout: Duration::from_secs(15),
            forbidden_read_pattern: "_search".to_string(),
        }
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(u64),
        Text(String),
    }

    /// Serialize Duration to human-readable string (e.g., "30s", "250ms")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize a duration given as bare seconds (`3600`) or a string
    /// (`"30s"`, `"5m"`, `"100ms"`, `"3600"`)
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the value cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(s) => parse(s.trim()).map_err(serde::de::Error::custom),
        }
    }

    fn parse(s: &str) -> Result<Duration, String> {
        let number = |n: &str| n.parse::<u64>().map_err(|e| format!("invalid duration '{s}': {e}"));

        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            number(ms).map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            number(secs).map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            number(mins)?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("duration '{s}' is out of range"))
        } else {
            number(s).map(Duration::from_secs)
        }
    }
}
