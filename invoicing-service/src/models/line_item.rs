//! Line item model for invoicing-service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Line item on an invoice. Owned by exactly one invoice; it has no identity
/// of its own and is replaced wholesale when the invoice's items change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_percent: Decimal,
    /// `quantity × unit_price × (1 + tax_percent / 100)` unless the caller
    /// supplied an explicit total.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

