//! Mock remote clients for testing
//!
//! Provides in-memory implementations of the client traits so handlers and
//! the org-chart assembler can be tested without network calls.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{BlogApi, CrmApi, DirectoryApi};
use crate::error::{ApiError, Result};
use crate::models::{
    ClientAccount, ClientDocument, ClientRecord, ContactSubmission, DirectoryUser,
};

/// Tracks call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub probe_entity_set: usize,
    pub create_contact_submission: usize,
    pub create_client_record: usize,
    pub email_exists: usize,
    pub client_number_exists: usize,
    pub find_client_by_email: usize,
    pub list_client_documents: usize,
    pub get_client_document: usize,
    pub get_users: usize,
    pub get_user_photo: usize,
    pub fetch: usize,
}

/// Login bookkeeping written back to the CRM
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginUpdate {
    Failed { client_id: String, attempts: u32 },
    Succeeded { client_id: String },
}

/// Mock CRM client.
///
/// # Example
/// ```ignore
/// let crm = MockCrmClient::new()
///     .with_existing_emails(&["taken@example.com"])
///     .await;
/// assert!(crm.email_exists("taken@example.com").await?);
/// ```
pub struct MockCrmClient {
    entity_sets: Arc<Mutex<Vec<String>>>,
    probed: Arc<Mutex<Vec<String>>>,
    existing_emails: Arc<Mutex<Vec<String>>>,
    existing_client_numbers: Arc<Mutex<Vec<String>>>,
    accounts: Arc<Mutex<Vec<ClientAccount>>>,
    documents: Arc<Mutex<Vec<ClientDocument>>>,
    contacts: Arc<Mutex<Vec<ContactSubmission>>>,
    clients: Arc<Mutex<Vec<ClientRecord>>>,
    login_updates: Arc<Mutex<Vec<LoginUpdate>>>,
    connected: Arc<Mutex<bool>>,
    /// Error to return on the next call, consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    call_count: Arc<Mutex<CallCounts>>,
}

impl Default for MockCrmClient {
    fn default() -> Self {
        Self {
            entity_sets: Arc::new(Mutex::new(Vec::new())),
            probed: Arc::new(Mutex::new(Vec::new())),
            existing_emails: Arc::new(Mutex::new(Vec::new())),
            existing_client_numbers: Arc::new(Mutex::new(Vec::new())),
            accounts: Arc::new(Mutex::new(Vec::new())),
            documents: Arc::new(Mutex::new(Vec::new())),
            contacts: Arc::new(Mutex::new(Vec::new())),
            clients: Arc::new(Mutex::new(Vec::new())),
            login_updates: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
            error: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(CallCounts::default())),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl MockCrmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity sets that answer a probe; everything else is a 404
    pub async fn with_entity_sets(self, names: &[&str]) -> Self {
        *self.entity_sets.lock().await = to_strings(names);
        self
    }

    pub async fn with_existing_emails(self, emails: &[&str]) -> Self {
        *self.existing_emails.lock().await = to_strings(emails);
        self
    }

    pub async fn with_existing_client_numbers(self, numbers: &[&str]) -> Self {
        *self.existing_client_numbers.lock().await = to_strings(numbers);
        self
    }

    pub async fn with_accounts(self, accounts: Vec<ClientAccount>) -> Self {
        *self.accounts.lock().await = accounts;
        self
    }

    pub async fn with_documents(self, documents: Vec<ClientDocument>) -> Self {
        *self.documents.lock().await = documents;
        self
    }

    pub async fn disconnected(self) -> Self {
        *self.connected.lock().await = false;
        self
    }

    /// Configure an error to return on the next call.
    /// The error is consumed after one use.
    pub async fn with_error(self, error: ApiError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    /// Entity sets probed so far, in order
    pub async fn probed(&self) -> Vec<String> {
        self.probed.lock().await.clone()
    }

    pub async fn contacts(&self) -> Vec<ContactSubmission> {
        self.contacts.lock().await.clone()
    }

    pub async fn clients(&self) -> Vec<ClientRecord> {
        self.clients.lock().await.clone()
    }

    pub async fn login_updates(&self) -> Vec<LoginUpdate> {
        self.login_updates.lock().await.clone()
    }

    async fn check_error(&self) -> Result<()> {
        if let Some(e) = self.error.lock().await.take() {
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl CrmApi for MockCrmClient {
    async fn probe_entity_set(&self, name: &str) -> Result<bool> {
        self.call_count.lock().await.probe_entity_set += 1;
        self.probed.lock().await.push(name.to_string());
        self.check_error().await?;
        Ok(self.entity_sets.lock().await.iter().any(|s| s == name))
    }

    async fn contact_entity_set(&self) -> Result<String> {
        self.check_error().await?;
        Ok(self
            .entity_sets
            .lock()
            .await
            .first()
            .cloned()
            .unwrap_or_else(|| "e365_contactsubmissions".to_string()))
    }

    async fn create_contact_submission(&self, submission: &ContactSubmission) -> Result<String> {
        self.call_count.lock().await.create_contact_submission += 1;
        self.check_error().await?;
        let mut contacts = self.contacts.lock().await;
        contacts.push(submission.clone());
        Ok(format!("contact-{}", contacts.len()))
    }

    async fn create_client_record(&self, record: &ClientRecord) -> Result<String> {
        self.call_count.lock().await.create_client_record += 1;
        self.check_error().await?;
        let mut clients = self.clients.lock().await;
        clients.push(record.clone());
        Ok(format!("client-{}", clients.len()))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        self.call_count.lock().await.email_exists += 1;
        self.check_error().await?;
        let email = email.to_lowercase();
        Ok(self.existing_emails.lock().await.contains(&email))
    }

    async fn client_number_exists(&self, client_number: &str) -> Result<bool> {
        self.call_count.lock().await.client_number_exists += 1;
        self.check_error().await?;
        Ok(self
            .existing_client_numbers
            .lock()
            .await
            .iter()
            .any(|n| n == client_number))
    }

    async fn find_client_by_email(&self, email: &str) -> Result<Option<ClientAccount>> {
        self.call_count.lock().await.find_client_by_email += 1;
        self.check_error().await?;
        let email = email.to_lowercase();
        Ok(self
            .accounts
            .lock()
            .await
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn record_failed_login(&self, client_id: &str, attempts: u32) -> Result<()> {
        self.check_error().await?;
        self.login_updates.lock().await.push(LoginUpdate::Failed {
            client_id: client_id.to_string(),
            attempts,
        });
        Ok(())
    }

    async fn record_successful_login(&self, client_id: &str) -> Result<()> {
        self.check_error().await?;
        self.login_updates.lock().await.push(LoginUpdate::Succeeded {
            client_id: client_id.to_string(),
        });
        Ok(())
    }

    async fn list_client_documents(
        &self,
        client_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<ClientDocument>> {
        self.call_count.lock().await.list_client_documents += 1;
        self.check_error().await?;
        let search = search.map(|s| s.trim().to_lowercase());
        Ok(self
            .documents
            .lock()
            .await
            .iter()
            .filter(|d| d.is_owned_by(client_id))
            .filter(|d| {
                search
                    .as_deref()
                    .is_none_or(|term| d.name.to_lowercase().contains(term))
            })
            .cloned()
            .collect())
    }

    async fn get_client_document(&self, document_id: &str) -> Result<Option<ClientDocument>> {
        self.call_count.lock().await.get_client_document += 1;
        self.check_error().await?;
        Ok(self
            .documents
            .lock()
            .await
            .iter()
            .find(|d| d.id == document_id)
            .cloned())
    }

    async fn test_connection(&self) -> bool {
        *self.connected.lock().await
    }
}

/// Mock directory client
pub struct MockDirectoryClient {
    users: Arc<Mutex<Vec<DirectoryUser>>>,
    photos: Arc<Mutex<HashMap<String, String>>>,
    failing_photos: Arc<Mutex<HashSet<String>>>,
    connected: Arc<Mutex<bool>>,
    error: Arc<Mutex<Option<ApiError>>>,
    call_count: Arc<Mutex<CallCounts>>,
}

impl Default for MockDirectoryClient {
    fn default() -> Self {
        Self {
            users: Arc::new(Mutex::new(Vec::new())),
            photos: Arc::new(Mutex::new(HashMap::new())),
            failing_photos: Arc::new(Mutex::new(HashSet::new())),
            connected: Arc::new(Mutex::new(true)),
            error: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(CallCounts::default())),
        }
    }
}

impl MockDirectoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_users(self, users: Vec<DirectoryUser>) -> Self {
        *self.users.lock().await = users;
        self
    }

    pub async fn with_photo(self, user_id: &str, data_url: &str) -> Self {
        self.photos
            .lock()
            .await
            .insert(user_id.to_string(), data_url.to_string());
        self
    }

    /// Photo fetches for this user fail with a server error
    pub async fn with_failing_photo(self, user_id: &str) -> Self {
        self.failing_photos.lock().await.insert(user_id.to_string());
        self
    }

    pub async fn disconnected(self) -> Self {
        *self.connected.lock().await = false;
        self
    }

    pub async fn with_error(self, error: ApiError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }
}

#[async_trait]
impl DirectoryApi for MockDirectoryClient {
    async fn get_users(&self) -> Result<Vec<DirectoryUser>> {
        self.call_count.lock().await.get_users += 1;
        if let Some(e) = self.error.lock().await.take() {
            return Err(e.into());
        }
        Ok(self.users.lock().await.clone())
    }

    async fn get_user_photo(&self, user_id: &str) -> Result<Option<String>> {
        self.call_count.lock().await.get_user_photo += 1;
        if self.failing_photos.lock().await.contains(user_id) {
            return Err(ApiError::ServerError {
                status: 500,
                message: "photo unavailable".into(),
            }
            .into());
        }
        Ok(self.photos.lock().await.get(user_id).cloned())
    }

    async fn test_connection(&self) -> bool {
        *self.connected.lock().await
    }
}

/// Mock blog client
pub struct MockBlogClient {
    responses: Arc<Mutex<HashMap<String, Value>>>,
    requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
    error: Arc<Mutex<Option<ApiError>>>,
    call_count: Arc<Mutex<CallCounts>>,
}

impl Default for MockBlogClient {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(CallCounts::default())),
        }
    }
}

impl MockBlogClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_response(self, endpoint: &str, body: Value) -> Self {
        self.responses
            .lock()
            .await
            .insert(endpoint.to_string(), body);
        self
    }

    pub async fn with_error(self, error: ApiError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    /// Endpoint and query of every fetch, in order
    pub async fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl BlogApi for MockBlogClient {
    async fn fetch(&self, endpoint: &str, query: Option<&str>) -> Result<Value> {
        self.call_count.lock().await.fetch += 1;
        self.requests
            .lock()
            .await
            .push((endpoint.to_string(), query.map(str::to_string)));

        if let Some(e) = self.error.lock().await.take() {
            return Err(e.into());
        }

        self.responses
            .lock()
            .await
            .get(endpoint)
            .cloned()
            .ok_or_else(|| {
                ApiError::ServerError {
                    status: 404,
                    message: "WordPress API responded with status: 404".into(),
                }
                .into()
            })
    }
}
