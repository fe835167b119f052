//! Status command implementation

use colored::Colorize;

use crate::cli::Cli;
use crate::client::resolve::DEFAULT_CONTACT_SETS;
use crate::config::{AuthMode, Config};
use crate::error::Result;

/// Show the first four characters of a secret
fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}

fn setting(label: &str, value: Option<&str>, missing_hint: &str) {
    match value {
        Some(value) => println!("{} {}: {}", "✓".green(), label, value.cyan()),
        None => {
            println!("{} {} not configured", "✗".red(), label);
            println!("  → Set {}", missing_hint);
        }
    }
}

fn auth_summary(config: &Config) {
    match config.auth_mode() {
        AuthMode::ServicePrincipal(sp) => {
            println!(
                "{} Service principal: client {} in tenant {}",
                "✓".green(),
                sp.client_id.cyan(),
                sp.tenant_id.cyan()
            );
            println!("  Client secret: {}", mask(&sp.client_secret).dimmed());
        }
        AuthMode::AmbientIdentity(identity) => {
            match identity.platform {
                Some((endpoint, _)) => {
                    println!(
                        "{} Managed identity via {}",
                        "○".dimmed(),
                        endpoint.cyan()
                    );
                }
                None => {
                    println!(
                        "{} Managed identity via instance metadata (no service principal configured)",
                        "○".dimmed()
                    );
                    println!("  → Org chart routes need AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET");
                }
            }
            if let Some(client_id) = identity.client_id {
                println!("  User-assigned identity: {}", client_id.cyan());
            }
            if config.has_partial_principal() {
                println!(
                    "{} Incomplete service principal, missing {}",
                    "✗".red(),
                    config.missing_principal_parts().join(", ")
                );
            }
        }
    }
}

/// Print the resolved configuration
pub fn run(cli: &Cli) -> Result<()> {
    println!("{}\n", "Evergreen API Configuration Status".bold());

    let config = cli.load_config()?;

    match cli.config_path() {
        Some(path) => println!("Config file: {}", path.display().to_string().cyan()),
        None => {
            let default = Config::default_path()?;
            if default.exists() {
                println!("Config file: {}", default.display().to_string().cyan());
            } else {
                println!("Config file: {}", "none (environment only)".dimmed());
            }
        }
    }
    println!("Listen address: {}", config.bind_address().cyan());
    println!();

    setting(
        "CRM environment",
        config.dataverse_url.as_deref(),
        "DATAVERSE_ENVIRONMENT_URL",
    );
    auth_summary(&config);
    setting(
        "WordPress site",
        config.wordpress_url.as_deref(),
        "WORDPRESS_SITE_URL",
    );

    let masked = config.session_secret.as_deref().map(mask);
    setting("Session secret", masked.as_deref(), "CLIENT_SESSION_SECRET");

    let candidates = if config.contact_entity_sets.is_empty() {
        DEFAULT_CONTACT_SETS.join(", ")
    } else {
        config.contact_entity_sets.join(", ")
    };
    println!(
        "{} Contact entity set candidates: {}",
        "○".dimmed(),
        candidates.dimmed()
    );
    println!();

    Ok(())
}
