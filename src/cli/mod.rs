//! CLI command definitions and handlers

use std::path::Path;

use clap::{Parser, Subcommand};

pub mod probe;
pub mod serve;
pub mod status;

use crate::config::Config;
use crate::error::Result;

/// Evergreen API - backend for the 365 Evergreen website
#[derive(Parser, Debug)]
#[command(name = "evergreen-api")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override config file location
    #[arg(long, global = true, env = "EVERGREEN_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Listen address, e.g. 127.0.0.1:8080
    #[arg(long, global = true)]
    pub bind: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "EVERGREEN_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Show the resolved configuration
    Status,

    /// Check connectivity to the CRM and the directory
    Probe,
}

impl Cli {
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref().map(Path::new)
    }

    /// Load configuration and apply command-line overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_at(self.config_path())?;
        if let Some(bind) = &self.bind {
            config.bind = Some(bind.clone());
        }
        Ok(config)
    }
}
