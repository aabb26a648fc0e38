use crate::models::Identity;
use crate::services::jwt::JwtService;
use crate::services::repository::UserRepository;
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authorized, no token")]
    MissingToken,

    #[error("Not authorized, token failed")]
    InvalidToken,

    #[error("Authentication backend error: {0}")]
    Backend(anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Backend(e) => AppError::InternalError(e),
            other => AppError::Unauthorized(anyhow::anyhow!(other)),
        }
    }
}

/// Resolves a bearer credential to the caller's identity.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Verifies session JWTs and loads the account they name.
pub struct JwtAuthVerifier {
    jwt: JwtService,
    users: Arc<dyn UserRepository>,
}

impl JwtAuthVerifier {
    pub fn new(jwt: JwtService, users: Arc<dyn UserRepository>) -> Self {
        Self { jwt, users }
    }
}

#[async_trait]
impl AuthVerifier for JwtAuthVerifier {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.jwt.validate_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AuthError::InvalidToken
        })?;

        let user = self
            .users
            .find_by_id(&claims.sub)
            .await
            .map_err(|e| AuthError::Backend(anyhow::anyhow!(e)))?
            .ok_or_else(|| {
                tracing::debug!(user_id = %claims.sub, "Token names an unknown user");
                AuthError::InvalidToken
            })?;

        Ok(user.identity())
    }
}
