pub mod ai;
pub mod auth;
pub mod invoice;

pub use invoice::{ExistsResponse, InvoicePayload, InvoiceResponse, MessageResponse};
