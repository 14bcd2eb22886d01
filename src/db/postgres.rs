use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use super::{Session, Store, StoreError};
use crate::config::Config;
use crate::models::{Client, Invoice, NewClient, NewInvoice, NewUser, User};

const INVOICE_COLUMNS: &str = "i.id, i.client_id, i.title, i.amount, i.due_date, i.is_paid, i.created_at";

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(config.database_url())
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the migrations under `migrations/`
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(self.get_pool()).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for Database {
    async fn session(&self) -> Result<Box<dyn Session>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx }))
    }
}

/// A transaction on a pooled connection. Rolled back if dropped uncommitted.
struct PgSession {
    tx: Transaction<'static, Postgres>,
}

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateEmail,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Session for PgSession {
    async fn find_user(&mut self, id: i32) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn create_user(&mut self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_unique_violation)
    }

    async fn create_client(&mut self, client: NewClient) -> Result<Client, StoreError> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (owner_id, name, email)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, name, email, created_at
            "#,
        )
        .bind(client.owner_id)
        .bind(&client.name)
        .bind(&client.email)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(client)
    }

    async fn find_client(
        &mut self,
        owner_id: i32,
        client_id: i32,
    ) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, owner_id, name, email, created_at
            FROM clients
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(client_id)
        .bind(owner_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(client)
    }

    async fn find_by_owner(&mut self, owner_id: i32) -> Result<Vec<Client>, StoreError> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, owner_id, name, email, created_at
            FROM clients
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(clients)
    }

    async fn create_invoice(&mut self, invoice: NewInvoice) -> Result<Invoice, StoreError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (client_id, title, amount, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, client_id, title, amount, due_date, is_paid, created_at
            "#,
        )
        .bind(invoice.client_id)
        .bind(&invoice.title)
        .bind(&invoice.amount)
        .bind(invoice.due_date)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(invoice)
    }

    async fn find_invoice(
        &mut self,
        owner_id: i32,
        invoice_id: i32,
    ) -> Result<Option<Invoice>, StoreError> {
        let query = format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices i
            JOIN clients c ON c.id = i.client_id
            WHERE i.id = $1 AND c.owner_id = $2
            "#
        );

        let invoice = sqlx::query_as::<_, Invoice>(&query)
            .bind(invoice_id)
            .bind(owner_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(invoice)
    }

    async fn find_invoices_by_owner(&mut self, owner_id: i32) -> Result<Vec<Invoice>, StoreError> {
        let query = format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices i
            JOIN clients c ON c.id = i.client_id
            WHERE c.owner_id = $1
            ORDER BY i.created_at DESC, i.id DESC
            "#
        );

        let invoices = sqlx::query_as::<_, Invoice>(&query)
            .bind(owner_id)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(invoices)
    }

    async fn toggle_invoice_paid(&mut self, invoice_id: i32) -> Result<Invoice, StoreError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET is_paid = NOT is_paid
            WHERE id = $1
            RETURNING id, client_id, title, amount, due_date, is_paid, created_at
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::MissingRow(format!("invoice {invoice_id} does not exist")))?;

        Ok(invoice)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
