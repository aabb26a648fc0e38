//! Invoice use cases: ingestion, totals, validation, ownership and
//! persistence composed into create/list/get/update/delete.

use crate::dtos::invoice::InvoiceDraft;
use crate::error::InvoiceError;
use crate::models::{Identity, Invoice};
use crate::services::metrics;
use crate::services::repository::InvoiceRepository;
use crate::services::validator::{ensure_owner, resolve_new, resolve_update};
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct InvoiceService {
    repo: Arc<dyn InvoiceRepository>,
}

impl InvoiceService {
    pub fn new(repo: Arc<dyn InvoiceRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn InvoiceRepository> {
        &self.repo
    }

    #[instrument(skip(self))]
    pub async fn check_invoice_number_exists(
        &self,
        invoice_number: &str,
    ) -> Result<bool, InvoiceError> {
        tally(self.repo.exists_by_number(invoice_number).await.map_err(Into::into))
    }

    /// Validate and persist a new invoice owned by `owner`. Nothing is
    /// written unless every check passes.
    #[instrument(skip(self, owner, draft), fields(user_id = %owner.user_id))]
    pub async fn create_invoice(
        &self,
        owner: &Identity,
        draft: InvoiceDraft,
    ) -> Result<Invoice, InvoiceError> {
        let result = async {
            let fields = resolve_new(draft)?;
            let invoice = Invoice::new(owner.user_id.clone(), fields);
            let saved = self.repo.insert(invoice).await?;

            metrics::record_invoice_created();
            tracing::info!(
                invoice_id = %saved.id,
                invoice_number = %saved.invoice_number,
                "Invoice created"
            );
            Ok::<_, InvoiceError>(saved)
        }
        .await;
        tally(result)
    }

    #[instrument(skip(self, owner), fields(user_id = %owner.user_id))]
    pub async fn get_invoices(&self, owner: &Identity) -> Result<Vec<Invoice>, InvoiceError> {
        tally(
            self.repo
                .find_all_by_owner(&owner.user_id)
                .await
                .map_err(Into::into),
        )
    }

    #[instrument(skip(self, owner), fields(user_id = %owner.user_id))]
    pub async fn get_invoice_by_id(
        &self,
        owner: &Identity,
        id: &str,
    ) -> Result<Invoice, InvoiceError> {
        tally(self.owned(owner, id, "access").await)
    }

    /// Apply a partial payload. Omitted fields keep their stored values; a
    /// sent item list replaces the stored one.
    #[instrument(skip(self, owner, draft), fields(user_id = %owner.user_id))]
    pub async fn update_invoice(
        &self,
        owner: &Identity,
        id: &str,
        draft: InvoiceDraft,
    ) -> Result<Invoice, InvoiceError> {
        let result = async {
            let existing = self.owned(owner, id, "update").await?;
            let fields = resolve_update(&existing, draft)?;
            let updated = self
                .repo
                .update_by_id(id, existing.with_fields(fields))
                .await?
                .ok_or(InvoiceError::NotFound)?;

            tracing::info!(invoice_id = %updated.id, status = updated.status.as_str(), "Invoice updated");
            Ok::<_, InvoiceError>(updated)
        }
        .await;
        tally(result)
    }

    #[instrument(skip(self, owner), fields(user_id = %owner.user_id))]
    pub async fn delete_invoice(&self, owner: &Identity, id: &str) -> Result<(), InvoiceError> {
        let result = async {
            self.owned(owner, id, "delete").await?;
            if !self.repo.delete_by_id(id).await? {
                return Err(InvoiceError::NotFound);
            }
            metrics::record_invoice_deleted();
            tracing::info!(invoice_id = %id, "Invoice deleted");
            Ok::<_, InvoiceError>(())
        }
        .await;
        tally(result)
    }

    async fn owned(
        &self,
        owner: &Identity,
        id: &str,
        action: &'static str,
    ) -> Result<Invoice, InvoiceError> {
        let invoice = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(InvoiceError::NotFound)?;
        ensure_owner(&invoice, owner, action)?;
        Ok(invoice)
    }
}

fn tally<T>(result: Result<T, InvoiceError>) -> Result<T, InvoiceError> {
    if let Err(e) = &result {
        metrics::record_invoice_error(e.kind());
        match e {
            InvoiceError::Persistence(cause) => {
                tracing::error!(error = ?cause, "Invoice persistence failure")
            }
            other => tracing::debug!(error = %other, "Invoice request rejected"),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::invoice::InvoicePayload;
    use crate::error::RepositoryError;
    use crate::services::repository::InMemoryInvoiceRepository;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    fn identity(id: &str) -> Identity {
        Identity {
            user_id: id.to_string(),
            name: format!("User {}", id),
            email: format!("{}@example.com", id),
        }
    }

    fn draft(value: Value) -> InvoiceDraft {
        serde_json::from_value::<InvoicePayload>(value)
            .unwrap()
            .into_draft()
    }

    fn create_payload(number: &str) -> Value {
        json!({
            "invoiceNumber": number,
            "invoiceDate": "2024-01-01",
            "dueDate": "2024-01-31",
            "billingFrom": { "businessName": "Acme" },
            "billingTo": { "clientName": "Bob" },
            "items": [{ "name": "Design", "quantity": 2, "unitPrice": 100, "taxPercent": 10 }]
        })
    }

    fn service() -> InvoiceService {
        InvoiceService::new(Arc::new(InMemoryInvoiceRepository::new()))
    }

    #[tokio::test]
    async fn create_then_exists() {
        let service = service();
        let alice = identity("alice");

        let invoice = service
            .create_invoice(&alice, draft(create_payload("INV-001")))
            .await
            .unwrap();

        assert_eq!(invoice.user_id, "alice");
        assert_eq!(invoice.total, Decimal::from(220));
        assert!(service.check_invoice_number_exists("INV-001").await.unwrap());
        assert!(!service.check_invoice_number_exists("INV-002").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_number_leaves_first_untouched() {
        let service = service();
        let alice = identity("alice");
        let first = service
            .create_invoice(&alice, draft(create_payload("INV-001")))
            .await
            .unwrap();

        let err = service
            .create_invoice(&identity("bob"), draft(create_payload("INV-001")))
            .await
            .unwrap_err();

        assert!(matches!(err, InvoiceError::DuplicateKey { .. }));
        assert_eq!(service.get_invoice_by_id(&alice, &first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn other_users_are_refused_and_nothing_changes() {
        let service = service();
        let alice = identity("alice");
        let mallory = identity("mallory");
        let invoice = service
            .create_invoice(&alice, draft(create_payload("INV-001")))
            .await
            .unwrap();

        let get = service.get_invoice_by_id(&mallory, &invoice.id).await;
        let update = service
            .update_invoice(&mallory, &invoice.id, draft(json!({ "status": "paid" })))
            .await;
        let delete = service.delete_invoice(&mallory, &invoice.id).await;

        assert!(matches!(get, Err(InvoiceError::Authorization { action: "access" })));
        assert!(matches!(update, Err(InvoiceError::Authorization { action: "update" })));
        assert!(matches!(delete, Err(InvoiceError::Authorization { action: "delete" })));
        assert_eq!(
            service.get_invoice_by_id(&alice, &invoice.id).await.unwrap(),
            invoice
        );
    }

    #[tokio::test]
    async fn failed_update_keeps_previous_record() {
        let service = service();
        let alice = identity("alice");
        let invoice = service
            .create_invoice(&alice, draft(create_payload("INV-001")))
            .await
            .unwrap();

        let err = service
            .update_invoice(&alice, &invoice.id, draft(json!({ "status": "void", "notes": "x" })))
            .await
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Validation(_)));
        assert_eq!(
            service.get_invoice_by_id(&alice, &invoice.id).await.unwrap(),
            invoice
        );
    }

    #[tokio::test]
    async fn update_keeps_identity_and_creation_time() {
        let service = service();
        let alice = identity("alice");
        let invoice = service
            .create_invoice(&alice, draft(create_payload("INV-001")))
            .await
            .unwrap();

        let updated = service
            .update_invoice(&alice, &invoice.id, draft(json!({ "status": "paid" })))
            .await
            .unwrap();

        assert_eq!(updated.id, invoice.id);
        assert_eq!(updated.user_id, invoice.user_id);
        assert_eq!(updated.created_at, invoice.created_at);
        assert!(updated.updated_at >= invoice.updated_at);
        assert_eq!(updated.items, invoice.items);
    }

    #[tokio::test]
    async fn delete_is_hard_and_missing_ids_are_not_found() {
        let service = service();
        let alice = identity("alice");
        let invoice = service
            .create_invoice(&alice, draft(create_payload("INV-001")))
            .await
            .unwrap();

        service.delete_invoice(&alice, &invoice.id).await.unwrap();

        assert!(matches!(
            service.get_invoice_by_id(&alice, &invoice.id).await,
            Err(InvoiceError::NotFound)
        ));
        assert!(matches!(
            service.delete_invoice(&alice, &invoice.id).await,
            Err(InvoiceError::NotFound)
        ));
        assert!(!service.check_invoice_number_exists("INV-001").await.unwrap());
    }

    struct FailingRepository;

    #[async_trait]
    impl InvoiceRepository for FailingRepository {
        async fn exists_by_number(&self, _: &str) -> Result<bool, RepositoryError> {
            Err(anyhow::anyhow!("store offline").into())
        }
        async fn insert(&self, _: Invoice) -> Result<Invoice, RepositoryError> {
            Err(anyhow::anyhow!("store offline").into())
        }
        async fn find_by_id(&self, _: &str) -> Result<Option<Invoice>, RepositoryError> {
            Err(anyhow::anyhow!("store offline").into())
        }
        async fn find_all_by_owner(&self, _: &str) -> Result<Vec<Invoice>, RepositoryError> {
            Err(anyhow::anyhow!("store offline").into())
        }
        async fn update_by_id(
            &self,
            _: &str,
            _: Invoice,
        ) -> Result<Option<Invoice>, RepositoryError> {
            Err(anyhow::anyhow!("store offline").into())
        }
        async fn delete_by_id(&self, _: &str) -> Result<bool, RepositoryError> {
            Err(anyhow::anyhow!("store offline").into())
        }
        async fn health_check(&self) -> Result<(), RepositoryError> {
            Err(anyhow::anyhow!("store offline").into())
        }
    }

    #[tokio::test]
    async fn store_failures_surface_as_persistence_errors() {
        let service = InvoiceService::new(Arc::new(FailingRepository));

        let err = service
            .create_invoice(&identity("alice"), draft(create_payload("INV-001")))
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::Persistence(_)));

        let err = service.get_invoices(&identity("alice")).await.unwrap_err();
        assert_eq!(err.kind(), "persistence");
    }

    #[tokio::test]
    async fn invalid_payload_never_reaches_the_store() {
        // FailingRepository would turn any store call into a persistence error.
        let service = InvoiceService::new(Arc::new(FailingRepository));

        let err = service
            .create_invoice(&identity("alice"), draft(json!({ "items": [] })))
            .await
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Validation(_)));
    }
}
