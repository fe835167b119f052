//! Contact entity-set resolution
//!
//! Different CRM environments publish the contact table under different
//! publisher prefixes. The resolver probes an ordered candidate list once and
//! remembers the answer for the life of the client.

use tokio::sync::OnceCell;

use super::CrmApi;
use crate::error::{ConfigError, Result};

/// Candidate entity sets, most specific first
pub const DEFAULT_CONTACT_SETS: [&str; 4] = [
    "e365_contactsubmissions",
    "msl_contactsubmissions",
    "cr_contactsubmissions",
    "contactsubmissions",
];

pub struct EntitySetResolver {
    candidates: Vec<String>,
    resolved: OnceCell<String>,
}

impl Default for EntitySetResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CONTACT_SETS)
    }
}

impl EntitySetResolver {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            resolved: OnceCell::new(),
        }
    }

    /// First candidate the CRM answers for.
    ///
    /// A 404 moves on to the next candidate; any other failure stops the
    /// search and is returned as is.
    pub async fn resolve(&self, crm: &dyn CrmApi) -> Result<String> {
        self.resolved
            .get_or_try_init(|| async {
                for name in &self.candidates {
                    if crm.probe_entity_set(name).await? {
                        log::info!("Resolved contact entity set: {}", name);
                        return Ok(name.clone());
                    }
                    log::debug!("Entity set {} not found", name);
                }

                Err(ConfigError::EntitySetUnresolved(self.candidates.join(", ")).into())
            })
            .await
            .cloned()
    }
}
