use crate::services::assistant::{Insights, Reminder, NO_INVOICES_MESSAGE};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Default, Deserialize)]
pub struct ParseInvoiceRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParseInvoiceResponse {
    pub success: bool,
    pub data: Map<String, Value>,
    pub message: &'static str,
}

impl ParseInvoiceResponse {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            data,
            message: "Invoice data parsed successfully",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub invoice_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub success: bool,
    pub reminder_text: String,
    pub invoice: ReminderInvoice,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderInvoice {
    pub number: String,
    pub client_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
}

impl From<Reminder> for ReminderResponse {
    fn from(reminder: Reminder) -> Self {
        Self {
            success: true,
            reminder_text: reminder.text,
            invoice: ReminderInvoice {
                number: reminder.invoice_number,
                client_name: reminder.client_name,
                amount: reminder.amount,
                due_date: reminder.due_date,
            },
        }
    }
}

/// `insights` is a sentence when there is nothing to analyze, otherwise a
/// list of suggestions.
#[derive(Debug, Serialize)]
pub struct DashboardSummaryResponse {
    pub insights: InsightsBody,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum InsightsBody {
    Message(&'static str),
    List(Vec<String>),
}

impl From<Insights> for DashboardSummaryResponse {
    fn from(insights: Insights) -> Self {
        let insights = match insights {
            Insights::NoInvoices => InsightsBody::Message(NO_INVOICES_MESSAGE),
            Insights::List(list) => InsightsBody::List(list),
        };
        Self { insights }
    }
}
