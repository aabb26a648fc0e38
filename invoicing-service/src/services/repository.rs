use crate::error::RepositoryError;
use crate::models::{Invoice, User};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Persistence boundary for invoices. Every call is atomic for a single
/// document; `invoice_number` is unique across all invoices.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn exists_by_number(&self, invoice_number: &str) -> Result<bool, RepositoryError>;

    /// Fails with `RepositoryError::DuplicateKey` when the number is taken.
    async fn insert(&self, invoice: Invoice) -> Result<Invoice, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>, RepositoryError>;

    async fn find_all_by_owner(&self, user_id: &str) -> Result<Vec<Invoice>, RepositoryError>;

    /// Replace the stored document. `None` when the id no longer exists.
    async fn update_by_id(
        &self,
        id: &str,
        invoice: Invoice,
    ) -> Result<Option<Invoice>, RepositoryError>;

    async fn delete_by_id(&self, id: &str) -> Result<bool, RepositoryError>;

    async fn health_check(&self) -> Result<(), RepositoryError>;
}

/// Persistence boundary for accounts; `email` is unique.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn update(&self, user: User) -> Result<Option<User>, RepositoryError>;
}

/// Invoice store held in process memory. Enforces the same uniqueness rule
/// as the database index.
#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: Mutex<HashMap<String, Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Invoice>>, RepositoryError> {
        self.invoices
            .lock()
            .map_err(|e| anyhow::anyhow!("Invoice store mutex poisoned: {}", e).into())
    }
}

fn number_taken(invoices: &HashMap<String, Invoice>, number: &str, except_id: &str) -> bool {
    invoices
        .values()
        .any(|i| i.invoice_number == number && i.id != except_id)
}

fn duplicate_invoice_number() -> RepositoryError {
    RepositoryError::DuplicateKey {
        field: "invoiceNumber".to_string(),
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn exists_by_number(&self, invoice_number: &str) -> Result<bool, RepositoryError> {
        Ok(number_taken(&*self.lock()?, invoice_number, ""))
    }

    async fn insert(&self, invoice: Invoice) -> Result<Invoice, RepositoryError> {
        let mut invoices = self.lock()?;
        if number_taken(&invoices, &invoice.invoice_number, "") {
            return Err(duplicate_invoice_number());
        }
        invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(invoice)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn find_all_by_owner(&self, user_id: &str) -> Result<Vec<Invoice>, RepositoryError> {
        let mut owned: Vec<Invoice> = self
            .lock()?
            .values()
            .filter(|i| i.is_owned_by(user_id))
            .cloned()
            .collect();
        owned.sort_by_key(|i| i.created_at);
        Ok(owned)
    }

    async fn update_by_id(
        &self,
        id: &str,
        invoice: Invoice,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let mut invoices = self.lock()?;
        if !invoices.contains_key(id) {
            return Ok(None);
        }
        if number_taken(&invoices, &invoice.invoice_number, id) {
            return Err(duplicate_invoice_number());
        }
        invoices.insert(id.to_string(), invoice.clone());
        Ok(Some(invoice))
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.remove(id).is_some())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.lock().map(|_| ())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, User>>, RepositoryError> {
        self.users
            .lock()
            .map_err(|e| anyhow::anyhow!("User store mutex poisoned: {}", e).into())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.lock()?;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::DuplicateKey {
                field: "email".to_string(),
            });
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepositoryError> {
        let mut users = self.lock()?;
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}
