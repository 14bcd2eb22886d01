//! Credential store: users, clients and invoices behind a session-scoped repository.
//!
//! Handlers open a [`Session`] per request, run their queries through it and
//! call [`Session::commit`] on success. Dropping a session without committing
//! discards its writes and releases the underlying connection.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::models::{Client, Invoice, NewClient, NewInvoice, NewUser, User};

pub use memory::MemoryStore;
pub use postgres::Database;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    /// A referenced or updated row does not exist
    #[error("missing row: {0}")]
    MissingRow(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Source of per-request sessions
#[async_trait]
pub trait Store: Send + Sync {
    async fn session(&self) -> Result<Box<dyn Session>, StoreError>;
}

/// A unit of work against the store
///
/// Every client and invoice lookup takes the caller's user id so that rows
/// owned by someone else are indistinguishable from rows that do not exist.
#[async_trait]
pub trait Session: Send {
    async fn find_user(&mut self, id: i32) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::DuplicateEmail`] when the email is taken
    async fn create_user(&mut self, user: NewUser) -> Result<User, StoreError>;

    async fn create_client(&mut self, client: NewClient) -> Result<Client, StoreError>;

    /// Client `client_id` if it belongs to `owner_id`
    async fn find_client(&mut self, owner_id: i32, client_id: i32)
    -> Result<Option<Client>, StoreError>;

    /// Clients of `owner_id`, newest first
    async fn find_by_owner(&mut self, owner_id: i32) -> Result<Vec<Client>, StoreError>;

    async fn create_invoice(&mut self, invoice: NewInvoice) -> Result<Invoice, StoreError>;

    /// Invoice `invoice_id` if its client belongs to `owner_id`
    async fn find_invoice(
        &mut self,
        owner_id: i32,
        invoice_id: i32,
    ) -> Result<Option<Invoice>, StoreError>;

    /// Invoices across all clients of `owner_id`, newest first
    async fn find_invoices_by_owner(&mut self, owner_id: i32) -> Result<Vec<Invoice>, StoreError>;

    /// Flip the paid flag and return the updated row. Last write wins.
    async fn toggle_invoice_paid(&mut self, invoice_id: i32) -> Result<Invoice, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Open the store selected by the configuration
///
/// PostgreSQL is migrated first when `RUN_MIGRATIONS` is set.
pub async fn init(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    if config.uses_memory_store() {
        tracing::warn!("using the in-memory store, data will not survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db = Database::new(config).await?;
    tracing::info!("database connection established");

    if config.run_migrations {
        db.migrate().await?;
        tracing::info!("migrations applied");
    }

    Ok(Arc::new(db))
}
