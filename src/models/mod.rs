//! Domain models shared by the remote clients and the HTTP handlers

pub mod client;
pub mod contact;
pub mod directory;

pub use client::{ClientAccount, ClientDocument, ClientRecord};
pub use contact::{ContactSubmission, ServiceCategory};
pub use directory::{DirectoryUser, GraphUser, OrgNode};
