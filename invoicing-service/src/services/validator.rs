//! Invoice validation and aggregate precedence.
//!
//! A caller-supplied `subTotal`, `taxTotal` or `total` is used verbatim;
//! otherwise the value computed from the items is used. On update, fields
//! the caller did not send keep their stored value.

use crate::dtos::invoice::{InvoiceDraft, ItemInput};
use crate::error::{InvoiceError, ValidationFailure};
use crate::models::{Identity, Invoice, InvoiceFields, InvoiceStatus};
use crate::services::normalizer::{normalize_items, NormalizedItems, TOTALS_TOO_LARGE};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

const REQUIRED_HEADER_FIELDS: [&str; 3] = ["invoiceNumber", "invoiceDate", "dueDate"];

/// Resolve a draft into the fields of a new invoice.
pub fn resolve_new(draft: InvoiceDraft) -> Result<InvoiceFields, ValidationFailure> {
    let mut failure = ValidationFailure::default();

    let invoice_number = draft.invoice_number.unwrap_or_else(|| {
        failure.missing("invoiceNumber");
        String::new()
    });
    let invoice_date = required_date(&mut failure, "invoiceDate", draft.invoice_date.as_deref());
    let due_date = required_date(&mut failure, "dueDate", draft.due_date.as_deref());

    let billing_from = draft.billing_from.unwrap_or_default();
    if billing_from.business_name.trim().is_empty() {
        failure.missing("businessName");
    }
    let billing_to = draft.billing_to.unwrap_or_default();
    if billing_to.client_name.trim().is_empty() {
        failure.missing("clientName");
    }

    let status = resolve_status(&mut failure, draft.status.as_deref()).unwrap_or_default();
    let normalized = resolve_items(&mut failure, draft.items.as_deref().unwrap_or_default());
    record_malformed(&mut failure, draft.malformed);

    let (Some(invoice_date), Some(due_date), Some(normalized)) = (invoice_date, due_date, normalized)
    else {
        return Err(finish(failure));
    };
    if !failure.is_empty() {
        return Err(finish(failure));
    }

    let sub_total = draft.sub_total.unwrap_or(normalized.sub_total);
    let tax_total = draft.tax_total.unwrap_or(normalized.tax_total);
    let total = match draft.total {
        Some(total) => total,
        None => combined_total(sub_total, tax_total)?,
    };

    Ok(InvoiceFields {
        invoice_number,
        invoice_date,
        due_date,
        billing_from,
        billing_to,
        items: normalized.items,
        notes: draft.notes.unwrap_or_default(),
        payment_terms: draft.payment_terms.unwrap_or_default(),
        status,
        sub_total,
        tax_total,
        total,
    })
}

/// Resolve a partial draft against the stored invoice. Items are replaced
/// wholesale when sent and kept otherwise.
pub fn resolve_update(
    existing: &Invoice,
    draft: InvoiceDraft,
) -> Result<InvoiceFields, ValidationFailure> {
    let mut failure = ValidationFailure::default();
    let current = existing.fields();

    let invoice_date = match draft.invoice_date.as_deref() {
        Some(raw) => parse_date(&mut failure, "invoiceDate", raw),
        None => Some(current.invoice_date),
    };
    let due_date = match draft.due_date.as_deref() {
        Some(raw) => parse_date(&mut failure, "dueDate", raw),
        None => Some(current.due_date),
    };

    if let Some(from) = &draft.billing_from {
        if from.business_name.trim().is_empty() {
            failure.missing("businessName");
        }
    }
    if let Some(to) = &draft.billing_to {
        if to.client_name.trim().is_empty() {
            failure.missing("clientName");
        }
    }

    let status = match draft.status.as_deref() {
        Some(raw) => resolve_status(&mut failure, Some(raw)),
        None => Some(current.status),
    };
    let normalized = match draft.items.as_deref() {
        Some(items) => resolve_items(&mut failure, items).map(Some),
        None => Some(None),
    };
    record_malformed(&mut failure, draft.malformed);

    let (Some(invoice_date), Some(due_date), Some(status), Some(normalized)) =
        (invoice_date, due_date, status, normalized)
    else {
        return Err(finish(failure));
    };
    if !failure.is_empty() {
        return Err(finish(failure));
    }

    let items_changed = normalized.is_some();
    let (items, computed_sub, computed_tax) = match normalized {
        Some(n) => (n.items, Some(n.sub_total), Some(n.tax_total)),
        None => (current.items, None, None),
    };

    let sub_total = draft.sub_total.or(computed_sub).unwrap_or(current.sub_total);
    let tax_total = draft.tax_total.or(computed_tax).unwrap_or(current.tax_total);
    let total = match draft.total {
        Some(total) => total,
        None if items_changed || draft.sub_total.is_some() || draft.tax_total.is_some() => {
            combined_total(sub_total, tax_total)?
        }
        None => current.total,
    };

    Ok(InvoiceFields {
        invoice_number: draft.invoice_number.unwrap_or(current.invoice_number),
        invoice_date,
        due_date,
        billing_from: draft.billing_from.unwrap_or(current.billing_from),
        billing_to: draft.billing_to.unwrap_or(current.billing_to),
        items,
        notes: draft.notes.unwrap_or(current.notes),
        payment_terms: draft.payment_terms.unwrap_or(current.payment_terms),
        status,
        sub_total,
        tax_total,
        total,
    })
}

/// `sub_total + tax_total`, reported as a validation failure on overflow.
fn combined_total(sub_total: Decimal, tax_total: Decimal) -> Result<Decimal, ValidationFailure> {
    sub_total.checked_add(tax_total).ok_or_else(|| {
        let mut failure = ValidationFailure::default();
        failure.invalid(TOTALS_TOO_LARGE);
        finish(failure)
    })
}

/// Ownership gate for get, update and delete.
pub fn ensure_owner(
    invoice: &Invoice,
    identity: &Identity,
    action: &'static str,
) -> Result<(), InvoiceError> {
    if invoice.is_owned_by(&identity.user_id) {
        Ok(())
    } else {
        Err(InvoiceError::Authorization { action })
    }
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_invoice_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn required_date(
    failure: &mut ValidationFailure,
    field: &str,
    raw: Option<&str>,
) -> Option<DateTime<Utc>> {
    match raw {
        Some(raw) => parse_date(failure, field, raw),
        None => {
            failure.missing(field);
            None
        }
    }
}

fn parse_date(failure: &mut ValidationFailure, field: &str, raw: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_invoice_date(raw);
    if parsed.is_none() {
        failure.invalid(format!("{} must be a valid date", field));
    }
    parsed
}

fn resolve_status(failure: &mut ValidationFailure, raw: Option<&str>) -> Option<InvoiceStatus> {
    match raw {
        None => Some(InvoiceStatus::default()),
        Some(raw) => match InvoiceStatus::from_str(raw) {
            Ok(status) => Some(status),
            Err(e) => {
                failure.invalid(e);
                None
            }
        },
    }
}

fn resolve_items(failure: &mut ValidationFailure, items: &[ItemInput]) -> Option<NormalizedItems> {
    check_item_ranges(failure, items);
    match normalize_items(items) {
        Ok(normalized) => Some(normalized),
        Err(item_failure) => {
            failure.merge(item_failure);
            None
        }
    }
}

// Quantity 0 is tolerated; negatives are not.
fn check_item_ranges(failure: &mut ValidationFailure, items: &[ItemInput]) {
    for (index, item) in items.iter().enumerate() {
        let n = index + 1;
        if item.quantity.is_some_and(|q| q < Decimal::ZERO) {
            failure.invalid(format!("Item {} quantity cannot be negative", n));
        }
        if item.unit_price.is_some_and(|p| p < Decimal::ZERO) {
            failure.invalid(format!("Item {} unit price cannot be negative", n));
        }
        if item
            .tax_percent
            .is_some_and(|t| t < Decimal::ZERO || t > Decimal::ONE_HUNDRED)
        {
            failure.invalid(format!("Item {} tax percent must be between 0 and 100", n));
        }
        if item.total.is_some_and(|t| t < Decimal::ZERO) {
            failure.invalid(format!("Item {} total cannot be negative", n));
        }
    }
}

fn record_malformed(failure: &mut ValidationFailure, malformed: Vec<String>) {
    for error in malformed {
        failure.invalid(error);
    }
}

fn finish(mut failure: ValidationFailure) -> ValidationFailure {
    failure.message = if REQUIRED_HEADER_FIELDS
        .iter()
        .any(|f| failure.missing.contains_key(*f))
    {
        "Missing required fields"
    } else if !failure.missing.is_empty() {
        "Missing required billing information"
    } else {
        "Validation error"
    }
    .to_string();
    failure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::invoice::InvoicePayload;
    use crate::models::{BillingFrom, BillingTo};
    use serde_json::{json, Value};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn draft(value: Value) -> InvoiceDraft {
        serde_json::from_value::<InvoicePayload>(value)
            .unwrap()
            .into_draft()
    }

    fn full_payload() -> Value {
        json!({
            "invoiceNumber": "INV-001",
            "invoiceDate": "2024-01-01",
            "dueDate": "2024-01-31",
            "billingFrom": { "businessName": "Acme" },
            "billingTo": { "clientName": "Bob" },
            "items": [{ "name": "Design", "quantity": 2, "unitPrice": 100, "taxPercent": 10 }]
        })
    }

    fn stored() -> Invoice {
        let fields = resolve_new(draft(full_payload())).unwrap();
        Invoice::new("owner-1".to_string(), fields)
    }

    #[test]
    fn new_invoice_computes_totals_and_defaults() {
        let fields = resolve_new(draft(full_payload())).unwrap();

        assert_eq!(fields.sub_total, dec("200"));
        assert_eq!(fields.tax_total, dec("20"));
        assert_eq!(fields.total, dec("220"));
        assert_eq!(fields.status, InvoiceStatus::Unpaid);
        assert_eq!(fields.notes, "");
        assert_eq!(
            fields.invoice_date,
            parse_invoice_date("2024-01-01T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn overrides_take_precedence() {
        let mut payload = full_payload();
        payload["subTotal"] = json!(150);
        payload["total"] = json!("999.99");

        let fields = resolve_new(draft(payload)).unwrap();

        assert_eq!(fields.sub_total, dec("150"));
        assert_eq!(fields.tax_total, dec("20"));
        assert_eq!(fields.total, dec("999.99"));
    }

    #[test]
    fn total_without_override_uses_overridden_parts() {
        let mut payload = full_payload();
        payload["taxTotal"] = json!(5);

        let fields = resolve_new(draft(payload)).unwrap();
        assert_eq!(fields.total, dec("205"));
    }

    #[test]
    fn reports_every_missing_field() {
        let err = resolve_new(draft(json!({ "items": [] }))).unwrap_err();

        assert_eq!(err.message, "Missing required fields");
        for field in ["invoiceNumber", "invoiceDate", "dueDate", "businessName", "clientName"] {
            assert_eq!(err.missing.get(field), Some(&true), "{field} not reported");
        }
    }

    #[test]
    fn missing_client_name_is_a_billing_error() {
        let mut payload = full_payload();
        payload["billingTo"] = json!({ "address": "Somewhere" });

        let err = resolve_new(draft(payload)).unwrap_err();

        assert_eq!(err.message, "Missing required billing information");
        assert_eq!(err.missing.len(), 1);
        assert_eq!(err.missing.get("clientName"), Some(&true));
    }

    #[test]
    fn rejects_bad_dates_status_and_item_ranges() {
        let mut payload = full_payload();
        payload["dueDate"] = json!("next tuesday");
        payload["status"] = json!("overdue");
        payload["items"] = json!([
            { "name": "A", "quantity": -1, "unitPrice": -5, "taxPercent": 101 },
            { "quantity": 1 }
        ]);

        let err = resolve_new(draft(payload)).unwrap_err();

        assert_eq!(err.message, "Validation error");
        assert!(err.errors.contains(&"dueDate must be a valid date".to_string()));
        assert!(err.errors.contains(&"Invalid invoice status: overdue".to_string()));
        assert!(err.errors.contains(&"Item 1 quantity cannot be negative".to_string()));
        assert!(err.errors.contains(&"Item 1 unit price cannot be negative".to_string()));
        assert!(err
            .errors
            .contains(&"Item 1 tax percent must be between 0 and 100".to_string()));
        assert!(err.errors.contains(&"Item 2 is missing a name".to_string()));
    }

    #[test]
    fn zero_quantity_is_tolerated() {
        let mut payload = full_payload();
        payload["items"] = json!([{ "name": "Placeholder", "quantity": 0, "unitPrice": 10 }]);

        let fields = resolve_new(draft(payload)).unwrap();
        assert_eq!(fields.total, Decimal::ZERO);
    }

    #[test]
    fn non_numeric_override_fails() {
        let mut payload = full_payload();
        payload["total"] = json!("a lot");

        let err = resolve_new(draft(payload)).unwrap_err();
        assert_eq!(err.errors, vec!["total must be a number".to_string()]);
    }

    #[test]
    fn rfc3339_dates_are_accepted() {
        assert!(parse_invoice_date("2024-03-05T10:30:00.000Z").is_some());
        assert!(parse_invoice_date("2024-03-05T10:30:00+02:00").is_some());
        assert!(parse_invoice_date("05/03/2024").is_none());
    }

    #[test]
    fn status_only_update_preserves_everything_else() {
        let existing = stored();

        let fields = resolve_update(&existing, draft(json!({ "status": "paid" }))).unwrap();

        assert_eq!(fields.status, InvoiceStatus::Paid);
        assert_eq!(fields.items, existing.items);
        assert_eq!(fields.total, dec("220"));
        assert_eq!(fields.sub_total, dec("200"));
        assert_eq!(fields.billing_to, existing.billing_to);
        assert_eq!(fields.invoice_number, "INV-001");
    }

    #[test]
    fn update_with_items_replaces_and_recomputes() {
        let existing = stored();

        let fields = resolve_update(
            &existing,
            draft(json!({ "items": [{ "name": "Audit", "quantity": 1, "price": 50, "tax": 20 }] })),
        )
        .unwrap();

        assert_eq!(fields.items.len(), 1);
        assert_eq!(fields.items[0].name, "Audit");
        assert_eq!(fields.sub_total, dec("50"));
        assert_eq!(fields.tax_total, dec("10"));
        assert_eq!(fields.total, dec("60"));
    }

    #[test]
    fn update_with_empty_items_clears_them() {
        let existing = stored();

        let fields = resolve_update(&existing, draft(json!({ "items": [] }))).unwrap();

        assert!(fields.items.is_empty());
        assert_eq!(fields.total, Decimal::ZERO);
    }

    #[test]
    fn update_subtotal_override_recomputes_total() {
        let existing = stored();

        let fields = resolve_update(&existing, draft(json!({ "subTotal": 300 }))).unwrap();

        assert_eq!(fields.sub_total, dec("300"));
        assert_eq!(fields.tax_total, dec("20"));
        assert_eq!(fields.total, dec("320"));
    }

    #[test]
    fn update_replaces_billing_objects_wholesale() {
        let existing = stored();

        let fields = resolve_update(
            &existing,
            draft(json!({ "billTo": { "clientName": "Carol", "clientPhone": "555" } })),
        )
        .unwrap();

        assert_eq!(
            fields.billing_to,
            BillingTo {
                client_name: "Carol".into(),
                phone: "555".into(),
                ..Default::default()
            }
        );
        assert_eq!(
            fields.billing_from,
            BillingFrom {
                business_name: "Acme".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn update_rejects_blank_client_name() {
        let existing = stored();

        let err = resolve_update(&existing, draft(json!({ "billingTo": { "clientName": "" } })))
            .unwrap_err();

        assert_eq!(err.missing.get("clientName"), Some(&true));
    }

    #[test]
    fn ownership_gate() {
        let invoice = stored();
        let owner = Identity {
            user_id: "owner-1".into(),
            name: "Owner".into(),
            email: "owner@example.com".into(),
        };
        let stranger = Identity {
            user_id: "someone-else".into(),
            ..owner.clone()
        };

        assert!(ensure_owner(&invoice, &owner, "access").is_ok());
        let err = ensure_owner(&invoice, &stranger, "delete").unwrap_err();
        assert_eq!(err.to_string(), "Not authorized to delete this invoice");
    }

    #[test]
    fn overflowing_aggregate_overrides_are_rejected() {
        let mut payload = full_payload();
        payload["subTotal"] = json!("70000000000000000000000000000");
        payload["taxTotal"] = json!("70000000000000000000000000000");

        let err = resolve_new(draft(payload)).unwrap_err();

        assert_eq!(err.message, "Validation error");
        assert_eq!(err.errors, vec![TOTALS_TOO_LARGE.to_string()]);
    }

    #[test]
    fn explicit_total_skips_the_overflowing_sum() {
        let mut payload = full_payload();
        payload["subTotal"] = json!("70000000000000000000000000000");
        payload["taxTotal"] = json!("70000000000000000000000000000");
        payload["total"] = json!("79000000000000000000000000000");

        let fields = resolve_new(draft(payload)).unwrap();

        assert_eq!(fields.total, dec("79000000000000000000000000000"));
    }

    #[test]
    fn overflowing_override_on_update_leaves_totals_unresolved() {
        let existing = stored();

        let err = resolve_update(
            &existing,
            draft(json!({ "subTotal": "79228162514264337593543950335" })),
        )
        .unwrap_err();

        assert_eq!(err.errors, vec![TOTALS_TOO_LARGE.to_string()]);
    }

    #[test]
    fn oversized_item_is_a_validation_error() {
        let mut payload = full_payload();
        payload["items"] = json!([{ "name": "X", "quantity": 1e20, "unitPrice": 1e20, "taxPercent": 0 }]);

        let err = resolve_new(draft(payload)).unwrap_err();

        assert!(err.errors.contains(&"Item 1 amount is too large".to_string()));
    }
}
