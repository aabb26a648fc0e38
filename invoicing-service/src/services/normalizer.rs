//! Line-item normalization and aggregate totals.

use crate::dtos::invoice::ItemInput;
use crate::error::ValidationFailure;
use crate::models::LineItem;
use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
pub const TOTALS_TOO_LARGE: &str = "Invoice totals are too large";

/// Canonical items plus the totals computed from them.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItems {
    pub items: Vec<LineItem>,
    pub sub_total: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
}

/// Turn item inputs into line items and compute aggregate totals.
///
/// Missing quantities, prices and tax rates count as zero. An explicit
/// per-item total is kept for that item, but the aggregates are always
/// summed from `quantity × unit_price` and its tax, never from item totals.
/// Every item without a name, and every amount too large to represent, is
/// reported.
pub fn normalize_items(inputs: &[ItemInput]) -> Result<NormalizedItems, ValidationFailure> {
    let mut failure = ValidationFailure::new("Validation error");
    let mut items = Vec::with_capacity(inputs.len());
    let mut sub_total = Some(Decimal::ZERO);
    let mut tax_total = Some(Decimal::ZERO);

    for (index, input) in inputs.iter().enumerate() {
        let n = index + 1;
        let Some(name) = input.name.clone() else {
            failure.invalid(format!("Item {} is missing a name", n));
            continue;
        };

        let quantity = input.quantity.unwrap_or(Decimal::ZERO);
        let unit_price = input.unit_price.unwrap_or(Decimal::ZERO);
        let tax_percent = input.tax_percent.unwrap_or(Decimal::ZERO);

        let Some((item_subtotal, item_tax, item_total)) =
            line_amounts(quantity, unit_price, tax_percent)
        else {
            failure.invalid(format!("Item {} amount is too large", n));
            continue;
        };

        sub_total = sub_total.and_then(|sum| sum.checked_add(item_subtotal));
        tax_total = tax_total.and_then(|sum| sum.checked_add(item_tax));

        items.push(LineItem {
            name,
            quantity,
            unit_price,
            tax_percent,
            total: input.total.unwrap_or(item_total),
        });
    }

    let totals = sub_total.zip(tax_total).and_then(|(sub_total, tax_total)| {
        sub_total
            .checked_add(tax_total)
            .map(|total| (sub_total, tax_total, total))
    });

    match totals {
        Some((sub_total, tax_total, total)) => {
            failure.into_result()?;
            Ok(NormalizedItems {
                items,
                sub_total,
                tax_total,
                total,
            })
        }
        None => {
            failure.invalid(TOTALS_TOO_LARGE);
            Err(failure)
        }
    }
}

/// Pre-tax amount, tax and total for one line, or `None` on overflow.
fn line_amounts(
    quantity: Decimal,
    unit_price: Decimal,
    tax_percent: Decimal,
) -> Option<(Decimal, Decimal, Decimal)> {
    let subtotal = quantity.checked_mul(unit_price)?;
    let tax = subtotal.checked_mul(tax_percent.checked_div(HUNDRED)?)?;
    let total = subtotal.checked_add(tax)?;
    Some((subtotal, tax, total))
}
