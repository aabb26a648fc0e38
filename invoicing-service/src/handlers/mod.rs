pub mod ai;
pub mod auth;
pub mod health;
pub mod invoices;

pub use ai::{dashboard_summary, generate_reminder, parse_invoice};
pub use auth::{login, me, register, update_me};
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use invoices::{
    check_invoice_number, create_invoice, delete_invoice, get_invoice, list_invoices,
    update_invoice,
};
