//! Client number allocation

use chrono::Utc;
use rand::Rng;

use crate::client::CrmApi;
use crate::error::Result;

/// Random candidates tried before falling back to the clock
const MAX_ATTEMPTS: usize = 10;

/// Upper-case initials of the first and last name
fn initials(first_name: &str, last_name: &str) -> String {
    first_name
        .chars()
        .take(1)
        .chain(last_name.chars().take(1))
        .flat_map(char::to_uppercase)
        .collect()
}

fn random_candidate(initials: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("CL{}{:06}", initials, suffix)
}

fn timestamp_fallback() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    format!("CL{}", tail)
}

/// Allocate a client number that is not yet in use.
///
/// `CL` + initials + six random digits, checked against the CRM up to ten
/// times, then `CL` + the last eight digits of the current millisecond clock.
pub async fn generate_client_number(
    crm: &dyn CrmApi,
    first_name: &str,
    last_name: &str,
) -> Result<String> {
    let initials = initials(first_name, last_name);

    for _ in 0..MAX_ATTEMPTS {
        let candidate = random_candidate(&initials);
        if !crm.client_number_exists(&candidate).await? {
            return Ok(candidate);
        }
        log::debug!("Client number {} already taken", candidate);
    }

    let fallback = timestamp_fallback();
    log::warn!("Falling back to timestamp client number {}", fallback);
    Ok(fallback)
}
