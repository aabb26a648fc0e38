//! Invoice model for invoicing-service.

use super::LineItem;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Invoice status. Paid and unpaid toggle freely; there is no one-way
/// transition between them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    #[default]
    Unpaid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Unpaid => "unpaid",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paid" => Ok(InvoiceStatus::Paid),
            "unpaid" => Ok(InvoiceStatus::Unpaid),
            other => Err(format!("Invalid invoice status: {}", other)),
        }
    }
}

/// The issuing business.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingFrom {
    pub business_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// The billed client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingTo {
    pub client_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Invoice document as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    /// Owning user; fixed at creation.
    pub user_id: String,
    pub invoice_number: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub invoice_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    pub billing_from: BillingFrom,
    pub billing_to: BillingTo,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub payment_terms: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Field values resolved from a payload, ready to become (or replace) an
/// invoice's mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceFields {
    pub invoice_number: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub billing_from: BillingFrom,
    pub billing_to: BillingTo,
    pub items: Vec<LineItem>,
    pub notes: String,
    pub payment_terms: String,
    pub status: InvoiceStatus,
    pub sub_total: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
}

impl Invoice {
    /// Build a new, not yet persisted invoice for `user_id`.
    pub fn new(user_id: String, fields: InvoiceFields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            invoice_number: fields.invoice_number,
            invoice_date: fields.invoice_date,
            due_date: fields.due_date,
            billing_from: fields.billing_from,
            billing_to: fields.billing_to,
            items: fields.items,
            notes: fields.notes,
            payment_terms: fields.payment_terms,
            status: fields.status,
            sub_total: fields.sub_total,
            tax_total: fields.tax_total,
            total: fields.total,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current mutable state, the baseline for partial updates.
    pub fn fields(&self) -> InvoiceFields {
        InvoiceFields {
            invoice_number: self.invoice_number.clone(),
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            billing_from: self.billing_from.clone(),
            billing_to: self.billing_to.clone(),
            items: self.items.clone(),
            notes: self.notes.clone(),
            payment_terms: self.payment_terms.clone(),
            status: self.status,
            sub_total: self.sub_total,
            tax_total: self.tax_total,
            total: self.total,
        }
    }

    /// Copy of this invoice carrying `fields`; identity, owner and
    /// `created_at` are kept.
    pub fn with_fields(&self, fields: InvoiceFields) -> Self {
        Self {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            invoice_number: fields.invoice_number,
            invoice_date: fields.invoice_date,
            due_date: fields.due_date,
            billing_from: fields.billing_from,
            billing_to: fields.billing_to,
            items: fields.items,
            notes: fields.notes,
            payment_terms: fields.payment_terms,
            status: fields.status,
            sub_total: fields.sub_total,
            tax_total: fields.tax_total,
            total: fields.total,
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
