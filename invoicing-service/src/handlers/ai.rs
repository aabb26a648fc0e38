use crate::dtos::ai::{
    DashboardSummaryResponse, ParseInvoiceRequest, ParseInvoiceResponse, ReminderRequest,
    ReminderResponse,
};
use crate::middleware::AuthUser;
use crate::services::AiAssistant;
use crate::startup::AppState;
use crate::utils::JsonBody;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

fn assistant(state: &AppState) -> Result<&AiAssistant, AppError> {
    state.assistant.as_ref().ok_or_else(|| {
        AppError::NotImplemented(
            "AI client not configured. Set GEMINI_API_KEY to enable AI features.".to_string(),
        )
    })
}

pub async fn parse_invoice(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    JsonBody(req): JsonBody<ParseInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let assistant = assistant(&state)?;
    let data = assistant
        .parse_invoice_text(req.text.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(ParseInvoiceResponse::new(data)))
}

pub async fn generate_reminder(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    JsonBody(req): JsonBody<ReminderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let assistant = assistant(&state)?;
    let invoice_id = req
        .invoice_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Please provide an invoice ID")))?;

    let reminder = assistant.generate_reminder(&identity, &invoice_id).await?;
    Ok(Json(ReminderResponse::from(reminder)))
}

pub async fn dashboard_summary(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let insights = assistant(&state)?.dashboard_summary(&identity).await?;
    Ok(Json(DashboardSummaryResponse::from(insights)))
}
