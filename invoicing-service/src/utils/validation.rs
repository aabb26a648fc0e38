use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

/// `Json<T>` whose rejection is the standard 400 error body.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(JsonBody(value))
    }
}

/// `JsonBody<T>` that also runs `validator` rules, reporting every failed
/// field at once.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate().map_err(validation_error)?;
        Ok(ValidatedJson(value))
    }
}

fn json_rejection(e: JsonRejection) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e.body_text()))
}

fn validation_error(e: ValidationErrors) -> AppError {
    let mut errors = Vec::new();
    let mut missing = BTreeMap::new();

    for (field, field_errors) in e.field_errors() {
        for error in field_errors {
            if error.code == "required" {
                missing.insert(field.to_string(), true);
            }
            errors.push(
                error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field)),
            );
        }
    }
    errors.sort();

    AppError::Validation {
        message: "Validation error".to_string(),
        errors,
        missing,
    }
}
