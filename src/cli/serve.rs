//! Serve command implementation

use crate::cli::Cli;
use crate::error::Result;
use crate::server;

/// Load configuration and run the HTTP server until shutdown
pub async fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    log::info!(
        "Starting evergreen-api {} on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind_address()
    );
    server::serve(&config).await
}
