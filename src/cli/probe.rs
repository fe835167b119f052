//! Probe command implementation

use colored::Colorize;

use crate::cli::Cli;
use crate::client::{CrmApi, DataverseClient, DirectoryApi, GraphClient};
use crate::error::Result;

/// Check CRM and directory connectivity and report the contact entity set
pub async fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    println!("{}\n", "Evergreen API Connectivity".bold());

    match DataverseClient::from_config(&config, &config.auth_mode()) {
        Ok(crm) => {
            println!("Credential source: {}", crm.credentials().source().describe().cyan());
            if crm.test_connection().await {
                println!("{} CRM reachable", "✓".green());
                match crm.contact_entity_set().await {
                    Ok(set) => println!("{} Contact entity set: {}", "✓".green(), set.cyan()),
                    Err(e) => println!("{} Contact entity set: {}", "✗".red(), e),
                }
            } else {
                println!("{} CRM unreachable (run with --debug for details)", "✗".red());
            }
        }
        Err(e) => println!("{} CRM: {}", "○".dimmed(), e),
    }

    match GraphClient::from_config(&config) {
        Ok(directory) => {
            if directory.test_connection().await {
                println!("{} Directory reachable", "✓".green());
            } else {
                println!("{} Directory unreachable (run with --debug for details)", "✗".red());
            }
        }
        Err(e) => println!("{} Directory: {}", "○".dimmed(), e),
    }

    println!();
    Ok(())
}
