//! Domain counters for invoicing-service.
//!
//! HTTP request metrics come from `service_core::middleware::metrics_middleware`;
//! these cover invoice lifecycle and AI usage.

use metrics::counter;

pub fn record_invoice_created() {
    counter!("invoices_created_total").increment(1);
}

pub fn record_invoice_deleted() {
    counter!("invoices_deleted_total").increment(1);
}

pub fn record_invoice_error(error_type: &'static str) {
    counter!("invoice_errors_total", "error_type" => error_type).increment(1);
}

/// `outcome` is "success" or a `GenerationError` kind.
pub fn record_ai_request(operation: &'static str, outcome: &'static str) {
    counter!("ai_requests_total", "operation" => operation, "outcome" => outcome).increment(1);
}
