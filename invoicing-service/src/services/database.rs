//! MongoDB connection handle and repository implementations.

use crate::error::RepositoryError;
use crate::models::{Invoice, User};
use crate::services::repository::{InvoiceRepository, UserRepository};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::{CountOptions, FindOneAndReplaceOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::OnceCell;

const INVOICES: &str = "invoices";
const USERS: &str = "users";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Process-wide database handle. The connection and index setup run once,
/// on first use; concurrent first callers wait on the same initialization.
#[derive(Clone)]
pub struct MongoDb {
    uri: String,
    database: String,
    db: Arc<OnceCell<Database>>,
}

impl MongoDb {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            db: Arc::new(OnceCell::new()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.db.initialized()
    }

    /// Database handle, connecting on first call.
    pub async fn database(&self) -> Result<&Database, mongodb::error::Error> {
        self.db.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<Database, mongodb::error::Error> {
        tracing::info!(database = %self.database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(&self.uri).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to MongoDB");
            e
        })?;
        let db = client.database(&self.database);
        initialize_indexes(&db).await?;
        tracing::info!(database = %self.database, "Connected to MongoDB");
        Ok(db)
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.database()
            .await?
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "MongoDB health check failed");
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn invoices(&self) -> Result<Collection<Invoice>, RepositoryError> {
        Ok(self.database().await.map_err(backend)?.collection(INVOICES))
    }

    async fn users(&self) -> Result<Collection<User>, RepositoryError> {
        Ok(self.database().await.map_err(backend)?.collection(USERS))
    }
}

async fn initialize_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let invoices = db.collection::<Invoice>(INVOICES);

    let number_index = IndexModel::builder()
        .keys(doc! { "invoice_number": 1 })
        .options(
            IndexOptions::builder()
                .name("invoice_number_unique".to_string())
                .unique(true)
                .build(),
        )
        .build();
    invoices.create_index(number_index, None).await?;
    tracing::info!("Created unique index on invoices.invoice_number");

    let owner_index = IndexModel::builder()
        .keys(doc! { "user_id": 1 })
        .options(
            IndexOptions::builder()
                .name("user_id_lookup".to_string())
                .build(),
        )
        .build();
    invoices.create_index(owner_index, None).await?;
    tracing::info!("Created index on invoices.user_id");

    let email_index = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(
            IndexOptions::builder()
                .name("email_unique".to_string())
                .unique(true)
                .build(),
        )
        .build();
    db.collection::<User>(USERS)
        .create_index(email_index, None)
        .await?;
    tracing::info!("Created unique index on users.email");

    Ok(())
}

fn backend(e: mongodb::error::Error) -> RepositoryError {
    RepositoryError::Backend(anyhow::Error::new(e))
}

/// Map a driver error, turning unique-index violations into `DuplicateKey`.
fn map_write_error(e: mongodb::error::Error) -> RepositoryError {
    let message = match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY_CODE => {
            Some(we.message.clone())
        }
        ErrorKind::Command(ce) if ce.code == DUPLICATE_KEY_CODE => Some(ce.message.clone()),
        _ => None,
    };

    match message {
        Some(message) => RepositoryError::DuplicateKey {
            field: duplicate_field(&message),
        },
        None => backend(e),
    }
}

/// Field name from a server message such as
/// `E11000 ... dup key: { invoice_number: "INV-1" }`, in API spelling.
fn duplicate_field(message: &str) -> String {
    let field = message
        .split("dup key: {")
        .nth(1)
        .and_then(|rest| rest.split(':').next())
        .map(|f| f.trim().trim_matches('"'))
        .unwrap_or("invoice_number");

    match field {
        "invoice_number" => "invoiceNumber".to_string(),
        other => other.to_string(),
    }
}

pub struct MongoInvoiceRepository {
    db: MongoDb,
}

impl MongoInvoiceRepository {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InvoiceRepository for MongoInvoiceRepository {
    async fn exists_by_number(&self, invoice_number: &str) -> Result<bool, RepositoryError> {
        let count = self
            .db
            .invoices()
            .await?
            .count_documents(
                doc! { "invoice_number": invoice_number },
                CountOptions::builder().limit(1).build(),
            )
            .await
            .map_err(backend)?;
        Ok(count > 0)
    }

    async fn insert(&self, invoice: Invoice) -> Result<Invoice, RepositoryError> {
        self.db
            .invoices()
            .await?
            .insert_one(&invoice, None)
            .await
            .map_err(map_write_error)?;
        Ok(invoice)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>, RepositoryError> {
        self.db
            .invoices()
            .await?
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(backend)
    }

    async fn find_all_by_owner(&self, user_id: &str) -> Result<Vec<Invoice>, RepositoryError> {
        let cursor = self
            .db
            .invoices()
            .await?
            .find(doc! { "user_id": user_id }, None)
            .await
            .map_err(backend)?;
        cursor.try_collect::<Vec<Invoice>>().await.map_err(backend)
    }

    async fn update_by_id(
        &self,
        id: &str,
        invoice: Invoice,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let options = FindOneAndReplaceOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.db
            .invoices()
            .await?
            .find_one_and_replace(doc! { "_id": id }, &invoice, options)
            .await
            .map_err(map_write_error)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = self
            .db
            .invoices()
            .await?
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(backend)?;
        Ok(result.deleted_count > 0)
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.db
            .health_check()
            .await
            .map_err(|e| RepositoryError::Backend(anyhow::anyhow!(e)))
    }
}

pub struct MongoUserRepository {
    db: MongoDb,
}

impl MongoUserRepository {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, user: User) -> Result<User, RepositoryError> {
        self.db
            .users()
            .await?
            .insert_one(&user, None)
            .await
            .map_err(map_write_error)?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        self.db
            .users()
            .await?
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(backend)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.db
            .users()
            .await?
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(backend)
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepositoryError> {
        let options = FindOneAndReplaceOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.db
            .users()
            .await?
            .find_one_and_replace(doc! { "_id": user.id.as_str() }, &user, options)
            .await
            .map_err(map_write_error)
    }
}
