//! Error taxonomy for invoice use cases and its mapping onto HTTP errors.

use service_core::error::AppError;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Every problem found in a payload, collected before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    pub message: String,
    pub errors: Vec<String>,
    /// Required fields that were absent or empty, keyed by API field name.
    pub missing: BTreeMap<String, bool>,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn missing(&mut self, field: &str) {
        self.missing.insert(field.to_string(), true);
        self.errors.push(format!("{} is required", field));
    }

    pub fn invalid(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn merge(&mut self, other: ValidationFailure) {
        self.errors.extend(other.errors);
        self.missing.extend(other.missing);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.missing.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise the failure itself.
    pub fn into_result(self) -> Result<(), ValidationFailure> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.message, self.errors.join("; "))
        }
    }
}

/// Failures raised by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Duplicate key on {field}")]
    DuplicateKey { field: String },

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Failures of invoice use cases.
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("{0}")]
    Validation(ValidationFailure),

    #[error("Invoice number already exists")]
    DuplicateKey { field: String },

    /// Authenticated, but not the owner. `action` reads as "access",
    /// "update" or "delete".
    #[error("Not authorized to {action} this invoice")]
    Authorization { action: &'static str },

    #[error("Invoice not found")]
    NotFound,

    #[error("Persistence failure: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl InvoiceError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            InvoiceError::Validation(_) => "validation",
            InvoiceError::DuplicateKey { .. } => "duplicate_key",
            InvoiceError::Authorization { .. } => "authorization",
            InvoiceError::NotFound => "not_found",
            InvoiceError::Persistence(_) => "persistence",
        }
    }
}

impl From<ValidationFailure> for InvoiceError {
    fn from(failure: ValidationFailure) -> Self {
        InvoiceError::Validation(failure)
    }
}

impl From<RepositoryError> for InvoiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateKey { field } => InvoiceError::DuplicateKey { field },
            RepositoryError::Backend(e) => InvoiceError::Persistence(e),
        }
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::Validation(failure) => AppError::Validation {
                message: failure.message,
                errors: failure.errors,
                missing: failure.missing,
            },
            InvoiceError::DuplicateKey { field } => AppError::DuplicateKey {
                message: "Invoice number already exists".to_string(),
                field,
            },
            e @ InvoiceError::Authorization { .. } => AppError::Forbidden(anyhow::anyhow!(e)),
            e @ InvoiceError::NotFound => AppError::NotFound(anyhow::anyhow!(e)),
            InvoiceError::Persistence(e) => AppError::DatabaseError(e),
        }
    }
}
