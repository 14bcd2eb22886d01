//! In-process store for tests and local development

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{Session, Store, StoreError};
use crate::models::{Client, Invoice, NewClient, NewInvoice, NewUser, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    clients: BTreeMap<i32, Client>,
    invoices: BTreeMap<i32, Invoice>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn owns_client(&self, owner_id: i32, client_id: i32) -> bool {
        self.clients
            .get(&client_id)
            .is_some_and(|client| client.owner_id == owner_id)
    }
}

/// Store backed by maps behind a lock
///
/// Writes are visible as soon as they are made; `commit` is a no-op, so an
/// abandoned session does not roll anything back.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn session(&self) -> Result<Box<dyn Session>, StoreError> {
        Ok(Box::new(MemorySession {
            tables: Arc::clone(&self.tables),
        }))
    }
}

struct MemorySession {
    tables: Arc<RwLock<Tables>>,
}

impl MemorySession {
    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|e| StoreError::Unavailable(format!("failed to acquire read lock: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|e| StoreError::Unavailable(format!("failed to acquire write lock: {e}")))
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn find_user(&mut self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.read()?;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&mut self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write()?;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let user = User {
            id: tables.next_id(),
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn create_client(&mut self, client: NewClient) -> Result<Client, StoreError> {
        let mut tables = self.write()?;

        // Same referential check the foreign key gives us in PostgreSQL
        if !tables.users.contains_key(&client.owner_id) {
            return Err(StoreError::MissingRow(format!(
                "user {} does not exist",
                client.owner_id
            )));
        }

        let client = Client {
            id: tables.next_id(),
            owner_id: client.owner_id,
            name: client.name,
            email: client.email,
            created_at: Utc::now(),
        };
        tables.clients.insert(client.id, client.clone());

        Ok(client)
    }

    async fn find_client(
        &mut self,
        owner_id: i32,
        client_id: i32,
    ) -> Result<Option<Client>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .clients
            .get(&client_id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }

    async fn find_by_owner(&mut self, owner_id: i32) -> Result<Vec<Client>, StoreError> {
        let tables = self.read()?;

        let mut clients: Vec<Client> = tables
            .clients
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        clients.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(clients)
    }

    async fn create_invoice(&mut self, invoice: NewInvoice) -> Result<Invoice, StoreError> {
        let mut tables = self.write()?;

        if !tables.clients.contains_key(&invoice.client_id) {
            return Err(StoreError::MissingRow(format!(
                "client {} does not exist",
                invoice.client_id
            )));
        }

        let invoice = Invoice {
            id: tables.next_id(),
            client_id: invoice.client_id,
            title: invoice.title,
            amount: invoice.amount,
            due_date: invoice.due_date,
            is_paid: false,
            created_at: Utc::now(),
        };
        tables.invoices.insert(invoice.id, invoice.clone());

        Ok(invoice)
    }

    async fn find_invoice(
        &mut self,
        owner_id: i32,
        invoice_id: i32,
    ) -> Result<Option<Invoice>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .invoices
            .get(&invoice_id)
            .filter(|i| tables.owns_client(owner_id, i.client_id))
            .cloned())
    }

    async fn find_invoices_by_owner(&mut self, owner_id: i32) -> Result<Vec<Invoice>, StoreError> {
        let tables = self.read()?;

        let mut invoices: Vec<Invoice> = tables
            .invoices
            .values()
            .filter(|i| tables.owns_client(owner_id, i.client_id))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(invoices)
    }

    async fn toggle_invoice_paid(&mut self, invoice_id: i32) -> Result<Invoice, StoreError> {
        let mut tables = self.write()?;

        let invoice = tables
            .invoices
            .get_mut(&invoice_id)
            .ok_or_else(|| StoreError::MissingRow(format!("invoice {invoice_id} does not exist")))?;
        invoice.is_paid = !invoice.is_paid;

        Ok(invoice.clone())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::BigDecimal;

    async fn user(session: &mut Box<dyn Session>, email: &str) -> User {
        session
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
    }

    async fn client(session: &mut Box<dyn Session>, owner_id: i32, name: &str) -> Client {
        session
            .create_client(NewClient {
                owner_id,
                name: name.to_string(),
                email: None,
            })
            .await
            .unwrap()
    }

    async fn invoice(session: &mut Box<dyn Session>, client_id: i32, title: &str) -> Invoice {
        session
            .create_invoice(NewInvoice {
                client_id,
                title: title.to_string(),
                amount: BigDecimal::from(100i64),
                due_date: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();
        user(&mut session, "a@x.com").await;

        let err = session
            .create_user(NewUser {
                email: "a@x.com".to_string(),
                password_hash: "other".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn clients_are_scoped_to_their_owner() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();
        let alice = user(&mut session, "alice@x.com").await;
        let bob = user(&mut session, "bob@x.com").await;

        let first = client(&mut session, alice.id, "Acme").await;
        let second = client(&mut session, alice.id, "Globex").await;
        client(&mut session, bob.id, "Initech").await;

        let listed = session.find_by_owner(alice.id).await.unwrap();
        let ids: Vec<i32> = listed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        assert!(session.find_client(bob.id, first.id).await.unwrap().is_none());
        assert!(session.find_client(alice.id, first.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invoices_are_scoped_through_their_client() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();
        let alice = user(&mut session, "alice@x.com").await;
        let bob = user(&mut session, "bob@x.com").await;
        let acme = client(&mut session, alice.id, "Acme").await;
        let globex = client(&mut session, alice.id, "Globex").await;
        let initech = client(&mut session, bob.id, "Initech").await;

        let older = invoice(&mut session, acme.id, "Logo").await;
        let newer = invoice(&mut session, globex.id, "Website").await;
        let foreign = invoice(&mut session, initech.id, "Audit").await;

        let listed = session.find_invoices_by_owner(alice.id).await.unwrap();
        let ids: Vec<i32> = listed.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        assert!(session.find_invoice(alice.id, foreign.id).await.unwrap().is_none());
        assert!(session.find_invoice(bob.id, foreign.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn toggle_flips_the_paid_flag() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();
        let alice = user(&mut session, "alice@x.com").await;
        let acme = client(&mut session, alice.id, "Acme").await;
        let created = invoice(&mut session, acme.id, "Logo").await;
        assert!(!created.is_paid);

        let paid = session.toggle_invoice_paid(created.id).await.unwrap();
        assert!(paid.is_paid);

        let unpaid = session.toggle_invoice_paid(created.id).await.unwrap();
        assert!(!unpaid.is_paid);
    }

    #[tokio::test]
    async fn dangling_references_are_missing_rows() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();

        let err = session
            .create_client(NewClient {
                owner_id: 404,
                name: "Acme".to_string(),
                email: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingRow(_)));

        let err = session
            .create_invoice(NewInvoice {
                client_id: 404,
                title: "Logo".to_string(),
                amount: BigDecimal::from(1i64),
                due_date: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingRow(_)));

        let err = session.toggle_invoice_paid(404).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingRow(_)));
    }

    #[tokio::test]
    async fn sessions_share_the_same_tables() {
        let store = MemoryStore::new();

        let mut first = store.session().await.unwrap();
        let alice = user(&mut first, "alice@x.com").await;
        first.commit().await.unwrap();

        let mut second = store.session().await.unwrap();
        let found = second.find_user_by_email("alice@x.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(alice.id));
    }
}
