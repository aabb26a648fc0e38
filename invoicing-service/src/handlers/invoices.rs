use crate::dtos::{ExistsResponse, InvoicePayload, InvoiceResponse, MessageResponse};
use crate::middleware::AuthUser;
use crate::startup::AppState;
use crate::utils::JsonBody;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

/// Public lookup used by the invoice form before submitting.
pub async fn check_invoice_number(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exists = state
        .invoices
        .check_invoice_number_exists(&invoice_number)
        .await?;

    Ok(Json(ExistsResponse { exists }))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    JsonBody(payload): JsonBody<InvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .create_invoice(&identity, payload.into_draft())
        .await?;

    Ok((StatusCode::CREATED, Json(InvoiceResponse::new(invoice))))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let invoices = state.invoices.get_invoices(&identity).await?;

    let body: Vec<InvoiceResponse> = invoices
        .into_iter()
        .map(|invoice| InvoiceResponse::with_owner(invoice, &identity))
        .collect();

    Ok(Json(body))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state.invoices.get_invoice_by_id(&identity, &id).await?;

    Ok(Json(InvoiceResponse::with_owner(invoice, &identity)))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<InvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .update_invoice(&identity, &id, payload.into_draft())
        .await?;

    Ok(Json(InvoiceResponse::new(invoice)))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.invoices.delete_invoice(&identity, &id).await?;

    Ok(Json(MessageResponse {
        message: "Invoice deleted successfully".to_string(),
    }))
}
