//! Evergreen API - website backend for 365 Evergreen

use clap::Parser;

mod cli;
mod client;
mod config;
mod error;
mod models;
mod orgchart;
mod server;
mod session;
mod validation;

use cli::{Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(&cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `RUST_LOG` sets the filter; `--debug` raises this crate to `debug`
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug {
        builder.filter_module("evergreen_api", log::LevelFilter::Debug);
    }
    builder.init();
}

async fn run(cli: &Cli) -> Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cli::serve::run(cli).await,
        Commands::Status => cli::status::run(cli),
        Commands::Probe => cli::probe::run(cli).await,
    }
}
