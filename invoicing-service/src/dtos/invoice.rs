//! Invoice request/response bodies.
//!
//! Clients send one of two historical shapes: the current one
//! (`billingFrom`, `billingTo`, `unitPrice`, `taxPercent`) and a legacy one
//! (`billFrom`, `billTo.clientAddress`, `price`, `tax`). `InvoicePayload`
//! accepts both, and `InvoicePayload::into_draft` folds them into a single
//! `InvoiceDraft` so that nothing downstream needs to look at field names.

use crate::models::{BillingFrom, BillingTo, Identity, Invoice, InvoiceStatus, LineItem};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub billing_from: Option<BillingFromPayload>,
    pub billing_to: Option<BillingToPayload>,
    pub bill_from: Option<BillingFromPayload>,
    pub bill_to: Option<LegacyBillToPayload>,
    pub items: Option<Vec<RawLineItem>>,
    pub notes: Option<String>,
    pub payment_terms: Option<String>,
    pub status: Option<String>,
    pub sub_total: Option<Value>,
    pub tax_total: Option<Value>,
    pub total: Option<Value>,
}

/// `billingFrom` and legacy `billFrom` share one shape.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingFromPayload {
    pub business_name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingToPayload {
    pub client_name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBillToPayload {
    pub client_name: Option<String>,
    pub client_address: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
}

/// Line item as sent by a client. Numeric fields stay untyped until
/// ingestion because clients send numbers, numeric strings and blanks.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    pub name: Option<String>,
    pub quantity: Option<Value>,
    pub unit_price: Option<Value>,
    pub price: Option<Value>,
    pub tax_percent: Option<Value>,
    pub tax: Option<Value>,
    pub total: Option<Value>,
}

/// Canonical line item input: names resolved, numbers coerced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ItemInput {
    pub name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub tax_percent: Option<Decimal>,
    /// Explicit per-item total, trusted verbatim when present.
    pub total: Option<Decimal>,
}

/// Canonical invoice input. `None` means the caller did not send the field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub billing_from: Option<BillingFrom>,
    pub billing_to: Option<BillingTo>,
    pub items: Option<Vec<ItemInput>>,
    pub notes: Option<String>,
    pub payment_terms: Option<String>,
    pub status: Option<String>,
    pub sub_total: Option<Decimal>,
    pub tax_total: Option<Decimal>,
    pub total: Option<Decimal>,
    /// Aggregate overrides that were sent but are not numbers.
    pub malformed: Vec<String>,
}

impl From<BillingFromPayload> for BillingFrom {
    fn from(p: BillingFromPayload) -> Self {
        Self {
            business_name: p.business_name.unwrap_or_default(),
            address: p.address.unwrap_or_default(),
            email: p.email.unwrap_or_default(),
            phone: p.phone.unwrap_or_default(),
        }
    }
}

impl From<BillingToPayload> for BillingTo {
    fn from(p: BillingToPayload) -> Self {
        Self {
            client_name: p.client_name.unwrap_or_default(),
            address: p.address.unwrap_or_default(),
            email: p.email.unwrap_or_default(),
            phone: p.phone.unwrap_or_default(),
        }
    }
}

impl From<LegacyBillToPayload> for BillingTo {
    fn from(p: LegacyBillToPayload) -> Self {
        Self {
            client_name: p.client_name.unwrap_or_default(),
            address: p.client_address.unwrap_or_default(),
            email: p.client_email.unwrap_or_default(),
            phone: p.client_phone.unwrap_or_default(),
        }
    }
}

impl From<RawLineItem> for ItemInput {
    fn from(raw: RawLineItem) -> Self {
        // The current name wins whenever it is present, even if it is not a
        // number; the legacy name is only consulted when it is absent.
        let unit_price = raw.unit_price.or(raw.price);
        let tax_percent = raw.tax_percent.or(raw.tax);

        Self {
            name: raw.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            quantity: raw.quantity.as_ref().and_then(to_decimal),
            unit_price: unit_price.as_ref().and_then(to_decimal),
            tax_percent: tax_percent.as_ref().and_then(to_decimal),
            total: raw.total.as_ref().and_then(to_decimal),
        }
    }
}

impl InvoicePayload {
    /// Fold both payload shapes into one draft. Current shapes take
    /// precedence over legacy ones when both are present.
    pub fn into_draft(self) -> InvoiceDraft {
        let mut malformed = Vec::new();
        let mut aggregate = |field: &str, value: Option<Value>| -> Option<Decimal> {
            let value = value?;
            let parsed = to_decimal(&value);
            if parsed.is_none() {
                malformed.push(format!("{} must be a number", field));
            }
            parsed
        };

        let sub_total = aggregate("subTotal", self.sub_total);
        let tax_total = aggregate("taxTotal", self.tax_total);
        let total = aggregate("total", self.total);

        InvoiceDraft {
            invoice_number: non_blank(self.invoice_number),
            invoice_date: non_blank(self.invoice_date),
            due_date: non_blank(self.due_date),
            billing_from: self.billing_from.or(self.bill_from).map(BillingFrom::from),
            billing_to: match (self.billing_to, self.bill_to) {
                (Some(current), _) => Some(current.into()),
                (None, Some(legacy)) => Some(legacy.into()),
                (None, None) => None,
            },
            items: self
                .items
                .map(|items| items.into_iter().map(ItemInput::from).collect()),
            notes: self.notes,
            payment_terms: self.payment_terms,
            status: non_blank(self.status),
            sub_total,
            tax_total,
            total,
            malformed,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Coerce a JSON value into a decimal. Numbers and numeric strings convert;
/// blanks, booleans and anything else yield `None`.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| Decimal::from_scientific(&n.to_string()).ok())
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            Decimal::from_str(trimmed)
                .ok()
                .or_else(|| Decimal::from_scientific(trimmed).ok())
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingFromResponse {
    pub business_name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingToResponse {
    pub client_name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Minimal owner details embedded in list/get responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Owner as either a bare id or an embedded summary.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OwnerRef {
    Summary(OwnerSummary),
    Id(String),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: OwnerRef,
    pub invoice_number: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub billing_from: BillingFromResponse,
    pub billing_to: BillingToResponse,
    pub items: Vec<LineItemResponse>,
    pub notes: String,
    pub payment_terms: String,
    pub status: InvoiceStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LineItem> for LineItemResponse {
    fn from(item: LineItem) -> Self {
        Self {
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            tax_percent: item.tax_percent,
            total: item.total,
        }
    }
}

impl InvoiceResponse {
    /// Response carrying the owner's id only.
    pub fn new(invoice: Invoice) -> Self {
        let owner = OwnerRef::Id(invoice.user_id.clone());
        Self::build(invoice, owner)
    }

    /// Response with the owner's name and email embedded.
    pub fn with_owner(invoice: Invoice, owner: &Identity) -> Self {
        let owner = OwnerRef::Summary(OwnerSummary {
            id: owner.user_id.clone(),
            name: owner.name.clone(),
            email: owner.email.clone(),
        });
        Self::build(invoice, owner)
    }

    fn build(invoice: Invoice, user: OwnerRef) -> Self {
        Self {
            id: invoice.id,
            user,
            invoice_number: invoice.invoice_number,
            invoice_date: invoice.invoice_date,
            due_date: invoice.due_date,
            billing_from: BillingFromResponse {
                business_name: invoice.billing_from.business_name,
                address: invoice.billing_from.address,
                email: invoice.billing_from.email,
                phone: invoice.billing_from.phone,
            },
            billing_to: BillingToResponse {
                client_name: invoice.billing_to.client_name,
                address: invoice.billing_to.address,
                email: invoice.billing_to.email,
                phone: invoice.billing_to.phone,
            },
            items: invoice.items.into_iter().map(LineItemResponse::from).collect(),
            notes: invoice.notes,
            payment_terms: invoice.payment_terms,
            status: invoice.status,
            sub_total: invoice.sub_total,
            tax_total: invoice.tax_total,
            total: invoice.total,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn payload(value: Value) -> InvoicePayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn legacy_shape_maps_to_current_names() {
        let draft = payload(json!({
            "billFrom": { "businessName": "Acme" },
            "billTo": { "clientName": "Bob", "clientAddress": "X", "clientEmail": "bob@x.io" },
            "items": [{ "name": "Logo", "quantity": 1, "price": 800, "tax": 0 }]
        }))
        .into_draft();

        assert_eq!(draft.billing_from.unwrap().business_name, "Acme");
        let to = draft.billing_to.unwrap();
        assert_eq!(to.client_name, "Bob");
        assert_eq!(to.address, "X");
        assert_eq!(to.email, "bob@x.io");

        let item = &draft.items.unwrap()[0];
        assert_eq!(item.unit_price, Some(dec("800")));
        assert_eq!(item.tax_percent, Some(dec("0")));
    }

    #[test]
    fn current_shape_wins_over_legacy() {
        let draft = payload(json!({
            "billingTo": { "clientName": "Current", "address": "New St" },
            "billTo": { "clientName": "Legacy", "clientAddress": "Old St" },
            "items": [{ "name": "A", "unitPrice": 5, "price": 9, "taxPercent": 10, "tax": 20 }]
        }))
        .into_draft();

        let to = draft.billing_to.unwrap();
        assert_eq!(to.client_name, "Current");
        assert_eq!(to.address, "New St");

        let item = &draft.items.unwrap()[0];
        assert_eq!(item.unit_price, Some(dec("5")));
        assert_eq!(item.tax_percent, Some(dec("10")));
    }

    #[test]
    fn null_current_field_falls_back_to_legacy() {
        let draft = payload(json!({
            "items": [{ "name": "A", "unitPrice": null, "price": "12.50" }]
        }))
        .into_draft();

        assert_eq!(draft.items.unwrap()[0].unit_price, Some(dec("12.50")));
    }

    #[test]
    fn numeric_strings_and_blanks_coerce() {
        assert_eq!(to_decimal(&json!("  3 ")), Some(dec("3")));
        assert_eq!(to_decimal(&json!(2.5)), Some(dec("2.5")));
        assert_eq!(to_decimal(&json!("")), None);
        assert_eq!(to_decimal(&json!("abc")), None);
        assert_eq!(to_decimal(&json!(true)), None);
        assert_eq!(to_decimal(&json!(null)), None);
    }

    #[test]
    fn non_numeric_override_is_reported() {
        let draft = payload(json!({ "subTotal": "lots", "total": 10 })).into_draft();

        assert_eq!(draft.sub_total, None);
        assert_eq!(draft.total, Some(dec("10")));
        assert_eq!(draft.malformed, vec!["subTotal must be a number".to_string()]);
    }

    #[test]
    fn omitted_fields_stay_unset() {
        let draft = payload(json!({ "status": "paid" })).into_draft();

        assert_eq!(draft.status.as_deref(), Some("paid"));
        assert!(draft.items.is_none());
        assert!(draft.billing_from.is_none());
        assert!(draft.invoice_number.is_none());
        assert!(draft.sub_total.is_none());
    }

    #[test]
    fn blank_item_name_is_unresolved() {
        let draft = payload(json!({ "items": [{ "name": "   ", "quantity": 1 }] })).into_draft();
        assert_eq!(draft.items.unwrap()[0].name, None);
    }
}
