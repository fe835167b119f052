//! Client portal sessions
//!
//! Registered clients log in with email and password and receive a signed
//! session token. Document routes verify that token, and document downloads
//! go through short-lived signed URLs.

pub mod client_number;
pub mod password;
pub mod signing;
pub mod token;

pub use client_number::generate_client_number;
pub use password::{hash_password, verify_password};
pub use signing::{DOWNLOAD_LINK_TTL_SECS, sign_download_url};
#[cfg(test)]
pub use signing::verify_download_signature;
pub use token::{SESSION_TTL_SECS, SessionClaims, SessionKeys};
