//! Domain models for invoicing-service.

mod invoice;
mod line_item;
mod user;

pub use invoice::{BillingFrom, BillingTo, Invoice, InvoiceFields, InvoiceStatus};
pub use line_item::LineItem;
pub use user::{Identity, ProfileUpdate, User};
