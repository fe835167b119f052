//! Client portal records: accounts and their documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Option-set value for an active client account
pub const CLIENT_STATUS_ACTIVE: u32 = 463_170_000;

/// Consecutive failed logins that lock an account
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// New client row written at registration
#[derive(Debug, Clone, Serialize)]
pub struct ClientRecord {
    #[serde(rename = "e365_name")]
    pub name: String,

    #[serde(rename = "e365_firstname")]
    pub first_name: String,

    #[serde(rename = "e365_surname")]
    pub last_name: String,

    #[serde(rename = "e365_email")]
    pub email: String,

    #[serde(rename = "e365_passwordhash")]
    pub password_hash: String,

    #[serde(rename = "e365_clientnumber")]
    pub client_number: String,

    #[serde(rename = "e365_company")]
    pub company: Option<String>,

    #[serde(rename = "e365_phone")]
    pub phone: Option<String>,

    #[serde(rename = "e365_status")]
    pub status: u32,

    #[serde(rename = "e365_loginattempts")]
    pub login_attempts: u32,

    #[serde(rename = "e365_accountlocked")]
    pub account_locked: bool,

    #[serde(rename = "e365_createddate")]
    pub created_date: DateTime<Utc>,
}

/// Existing client row as read for login
#[derive(Debug, Clone, Deserialize)]
pub struct ClientAccount {
    #[serde(rename = "e365_clientid")]
    pub id: String,

    #[serde(rename = "e365_name", default)]
    pub name: String,

    #[serde(rename = "e365_email", default)]
    pub email: String,

    #[serde(rename = "e365_passwordhash", default)]
    pub password_hash: Option<String>,

    #[serde(rename = "e365_clientnumber", default)]
    pub client_number: String,

    #[serde(rename = "e365_status", default)]
    pub status: Option<u32>,

    #[serde(rename = "e365_loginattempts", default)]
    pub login_attempts: Option<u32>,

    #[serde(rename = "e365_accountlocked", default)]
    pub account_locked: Option<bool>,
}

impl ClientAccount {
    pub fn is_active(&self) -> bool {
        self.status.is_none_or(|s| s == CLIENT_STATUS_ACTIVE)
    }

    pub fn is_locked(&self) -> bool {
        self.account_locked.unwrap_or(false)
    }

    pub fn failed_attempts(&self) -> u32 {
        self.login_attempts.unwrap_or(0)
    }
}

/// Document shared with a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDocument {
    #[serde(rename(deserialize = "e365_clientdocumentid", serialize = "id"))]
    pub id: String,

    #[serde(rename(deserialize = "e365_name", serialize = "name"), default)]
    pub name: String,

    #[serde(
        rename(deserialize = "e365_category", serialize = "category"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,

    #[serde(
        rename(deserialize = "e365_fileurl", serialize = "fileUrl"),
        default,
        skip_serializing
    )]
    pub file_url: Option<String>,

    #[serde(
        rename(deserialize = "e365_filesize", serialize = "size"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u64>,

    #[serde(
        rename(deserialize = "createdon", serialize = "createdOn"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_on: Option<String>,

    /// Owning client id
    #[serde(rename = "_e365_client_value", default, skip_serializing)]
    pub owner_id: Option<String>,
}

impl ClientDocument {
    pub fn is_owned_by(&self, client_id: &str) -> bool {
        self.owner_id
            .as_deref()
            .is_some_and(|owner| owner.eq_ignore_ascii_case(client_id))
    }
}
