//! AI assistance: free text to invoice draft, payment reminders and
//! dashboard insights. Runs only on its own routes, never inside invoice
//! CRUD, and every generator call is bounded by a timeout.

use crate::error::InvoiceError;
use crate::models::{Identity, Invoice, InvoiceStatus};
use crate::services::invoice_service::InvoiceService;
use crate::services::metrics;
use crate::services::providers::{GenerationError, TextGenerator};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

const FALLBACK_CLIENT_NAME: &str = "Valued Client";
const RECENT_INVOICES: usize = 5;
pub const NO_INVOICES_MESSAGE: &str = "No invoices found to analyze.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Please provide text to parse")]
    EmptyText,

    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("AI request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<AssistantError> for AppError {
    fn from(err: AssistantError) -> Self {
        match err {
            e @ AssistantError::EmptyText => AppError::BadRequest(anyhow::anyhow!(e)),
            AssistantError::Invoice(e) => e.into(),
            AssistantError::Generation(e) => AppError::BadGateway(e.to_string()),
            e @ AssistantError::Timeout(_) => AppError::GatewayTimeout(e.to_string()),
        }
    }
}

/// Drafted reminder plus the invoice details it was written from.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub text: String,
    pub invoice_number: String,
    pub client_name: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Insights {
    /// The caller has no invoices; the model was not consulted.
    NoInvoices,
    List(Vec<String>),
}

#[derive(Clone)]
pub struct AiAssistant {
    generator: Arc<dyn TextGenerator>,
    invoices: InvoiceService,
    timeout: Duration,
}

impl AiAssistant {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        invoices: InvoiceService,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            invoices,
            timeout,
        }
    }

    /// Ask the model for a legacy-shape invoice draft. The draft is only
    /// returned; creating an invoice from it goes through the normal
    /// create path.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn parse_invoice_text(&self, text: &str) -> Result<Map<String, Value>, AssistantError> {
        if text.trim().is_empty() {
            return Err(AssistantError::EmptyText);
        }

        let reply = self.generate("parse_invoice", &parse_prompt(text)).await?;
        let parsed = parse_json_object(&reply);
        record_parse("parse_invoice", &parsed);
        Ok(parsed?)
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn generate_reminder(
        &self,
        identity: &Identity,
        invoice_id: &str,
    ) -> Result<Reminder, AssistantError> {
        let invoice = self.invoices.get_invoice_by_id(identity, invoice_id).await?;

        let client_name = match invoice.billing_to.client_name.trim() {
            "" => FALLBACK_CLIENT_NAME.to_string(),
            name => name.to_string(),
        };
        let amount = invoice.total.round_dp(2);
        let prompt = reminder_prompt(&client_name, &invoice.invoice_number, amount, invoice.due_date);

        let text = self.generate("generate_reminder", &prompt).await?;
        metrics::record_ai_request("generate_reminder", "success");

        Ok(Reminder {
            text: text.trim().to_string(),
            invoice_number: invoice.invoice_number,
            client_name,
            amount,
            due_date: invoice.due_date,
        })
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn dashboard_summary(&self, identity: &Identity) -> Result<Insights, AssistantError> {
        let mut invoices = self.invoices.get_invoices(identity).await?;
        if invoices.is_empty() {
            return Ok(Insights::NoInvoices);
        }
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let reply = self
            .generate("dashboard_summary", &summary_prompt(&invoices))
            .await?;
        let insights = parse_json_object(&reply).and_then(|obj| insights_from(&obj));
        record_parse("dashboard_summary", &insights);
        Ok(Insights::List(insights?))
    }

    async fn generate(&self, operation: &'static str, prompt: &str) -> Result<String, AssistantError> {
        match tokio::time::timeout(self.timeout, self.generator.generate(prompt)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                tracing::warn!(operation, error = %e, "Text generation failed");
                metrics::record_ai_request(operation, e.kind());
                Err(e.into())
            }
            Err(_) => {
                tracing::warn!(operation, timeout = ?self.timeout, "Text generation timed out");
                metrics::record_ai_request(operation, "timeout");
                Err(AssistantError::Timeout(self.timeout))
            }
        }
    }
}

fn record_parse<T>(operation: &'static str, result: &Result<T, GenerationError>) {
    match result {
        Ok(_) => metrics::record_ai_request(operation, "success"),
        Err(e) => metrics::record_ai_request(operation, e.kind()),
    }
}

/// Remove Markdown code fences a model may wrap JSON in.
pub fn strip_code_fences(reply: &str) -> String {
    reply.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_json_object(reply: &str) -> Result<Map<String, Value>, GenerationError> {
    match serde_json::from_str::<Value>(&strip_code_fences(reply)) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(GenerationError::MalformedOutput(
            "Expected a JSON object".into(),
        )),
        Err(e) => Err(GenerationError::MalformedOutput(format!(
            "Reply is not valid JSON: {}",
            e
        ))),
    }
}

fn insights_from(obj: &Map<String, Value>) -> Result<Vec<String>, GenerationError> {
    let list = obj
        .get("insights")
        .and_then(Value::as_array)
        .ok_or_else(|| GenerationError::MalformedOutput("Missing \"insights\" array".into()))?;

    list.iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| GenerationError::MalformedOutput("Insight is not a string".into()))
        })
        .collect()
}

fn parse_prompt(text: &str) -> String {
    format!(
        r#"Analyze the following text and extract relevant information to create an invoice.
The output MUST be a valid JSON object with the following structure:
{{
    "billTo": {{
        "clientName": "string",
        "clientEmail": "string (if available)",
        "clientAddress": "string (if available)",
        "clientPhone": "string (if available)"
    }},
    "items": [
        {{
            "name": "string",
            "quantity": number,
            "price": number,
            "tax": number (percentage, default 0)
        }}
    ],
    "notes": "string (if any additional notes mentioned)",
    "paymentTerms": "Net 30" (or other terms if mentioned)
}}

Here is the text to parse:
-- TEXT START --
{}
-- TEXT END --

Extract the data and provide only the JSON object as output."#,
        text
    )
}

fn reminder_prompt(
    client_name: &str,
    invoice_number: &str,
    amount: Decimal,
    due_date: DateTime<Utc>,
) -> String {
    format!(
        r#"You are a professional and polite accounting assistant. Write a friendly payment reminder email to a client about an overdue or upcoming invoice payment.

Use the following details to personalize the email:
- Client Name: {}
- Invoice Number: {}
- Amount Due: ${:.2}
- Due Date: {}

The tone should be courteous and understanding, while clearly requesting payment. Include a call to action for the client to contact us if they have any questions or need assistance.

Start the email with a proper greeting and end with a professional closing."#,
        client_name,
        invoice_number,
        amount,
        due_date.format("%B %-d, %Y")
    )
}

// Stored totals may be caller overrides near the decimal limit.
fn saturating_total(invoices: &[&Invoice]) -> Decimal {
    invoices
        .iter()
        .fold(Decimal::ZERO, |sum, i| sum.saturating_add(i.total))
}

fn summary_prompt(invoices: &[Invoice]) -> String {
    let paid: Vec<&Invoice> = invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Paid)
        .collect();
    let unpaid: Vec<&Invoice> = invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Unpaid)
        .collect();
    let revenue = saturating_total(&paid);
    let outstanding = saturating_total(&unpaid);
    let recent = invoices
        .iter()
        .take(RECENT_INVOICES)
        .map(|i| {
            format!(
                "Invoice #{} for {:.2} with status: {}",
                i.invoice_number,
                i.total.round_dp(2),
                i.status.as_str()
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        r#"You are a friendly and insightful financial analyst for a small business owner.
Based on the following invoice data summary, provide 5 key insights about the user's business finances. Highlight trends, potential issues, or opportunities for improvement.
Each insight should be a concise and actionable string.
Do not just repeat the data points.

Data Summary:
Total number of invoices: {}
Total paid invoices: {}
Total unpaid/pending invoices: {}
Total revenue from paid invoices: {:.2}
Total outstanding amount from unpaid/pending invoices: {:.2}
Recent invoices (last {}): {}

Provide the insights as a JSON object with a single key "insights" containing an array of strings.
Example format: {{ "insights": ["Your revenue is growing steadily, consider investing in marketing to capitalize on this trend."] }}"#,
        invoices.len(),
        paid.len(),
        unpaid.len(),
        revenue.round_dp(2),
        outstanding.round_dp(2),
        RECENT_INVOICES,
        recent
    )
}
