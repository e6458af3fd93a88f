//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

/// Authenticating, tenant-scoping reverse proxy for a search backend
#[derive(Parser, Debug)]
#[command(name = "tenant-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "TENANT_GATEWAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides `logging.verbosity`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json); overrides `logging.format`
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gateway server (default)
    Serve,

    /// Load and validate configuration, then print it with secrets masked
    CheckConfig,
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref host) = self.host {
            config.server.host.clone_from(host);
        }
        if let Some(ref level) = self.log_level {
            config.logging.verbosity.clone_from(level);
        }
        if let Some(ref format) = self.log_format {
            config.logging.format = Some(format.clone());
        }
    }
}
