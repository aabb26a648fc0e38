use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        errors: Vec<String>,
        missing: BTreeMap<String, bool>,
    },

    #[error("Duplicate value for {field}")]
    DuplicateKey { message: String, field: String },

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

/// JSON body shared by every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<BTreeMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_field: Option<String>,
}

impl ErrorBody {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: None,
            missing: None,
            duplicate_field: None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::DuplicateKey { .. } | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) | AppError::DatabaseError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::Validation {
                message,
                errors,
                missing,
            } => ErrorBody {
                message,
                errors: (!errors.is_empty()).then_some(errors),
                missing: (!missing.is_empty()).then_some(missing),
                duplicate_field: None,
            },
            AppError::DuplicateKey { message, field } => ErrorBody {
                duplicate_field: Some(field),
                ..ErrorBody::message(message)
            },
            AppError::BadRequest(err)
            | AppError::NotFound(err)
            | AppError::Unauthorized(err)
            | AppError::Forbidden(err) => ErrorBody::message(err.to_string()),
            AppError::NotImplemented(msg) => ErrorBody::message(msg),
            AppError::BadGateway(msg) => {
                tracing::warn!(error = %msg, "Upstream dependency failed");
                ErrorBody::message(format!("Bad Gateway: {}", msg))
            }
            AppError::GatewayTimeout(msg) => {
                tracing::warn!(error = %msg, "Upstream dependency timed out");
                ErrorBody::message(msg)
            }
            AppError::ServiceUnavailable => ErrorBody::message("Service unavailable"),
            // Internal causes are logged here and never echoed to the caller.
            AppError::InternalError(err) | AppError::DatabaseError(err) => {
                tracing::error!(error = ?err, "Request failed with internal error");
                ErrorBody::message("Server error")
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = ?err, "Configuration error");
                ErrorBody::message("Server error")
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_lists_every_field() {
        let mut missing = BTreeMap::new();
        missing.insert("clientName".to_string(), true);
        missing.insert("dueDate".to_string(), true);

        let (status, body) = render(AppError::Validation {
            message: "Missing required fields".to_string(),
            errors: vec!["clientName is required".into(), "dueDate is required".into()],
            missing,
        })
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing required fields");
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
        assert_eq!(body["missing"]["clientName"], true);
        assert!(body.get("duplicateField").is_none());
    }

    #[tokio::test]
    async fn duplicate_key_names_the_field() {
        let (status, body) = render(AppError::DuplicateKey {
            message: "Invoice number already exists".to_string(),
            field: "invoiceNumber".to_string(),
        })
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["duplicateField"], "invoiceNumber");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let (status, body) =
            render(AppError::DatabaseError(anyhow::anyhow!("connection refused at 10.0.0.3"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server error");
        assert!(!body.to_string().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn forbidden_maps_to_403() {
        let (status, body) = render(AppError::Forbidden(anyhow::anyhow!("Not authorized"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Not authorized");
    }
}
