//! Registration, login and profile management.

use crate::error::RepositoryError;
use crate::models::{Identity, ProfileUpdate, User};
use crate::services::jwt::JwtService;
use crate::services::repository::UserRepository;
use crate::utils::{hash_password, verify_password, Password};
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error("Account backend error: {0}")]
    Backend(anyhow::Error),
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateKey { .. } => AccountError::EmailTaken,
            RepositoryError::Backend(e) => AccountError::Backend(e),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            e @ AccountError::EmailTaken => AppError::BadRequest(anyhow::anyhow!(e)),
            e @ AccountError::InvalidCredentials => AppError::Unauthorized(anyhow::anyhow!(e)),
            e @ AccountError::NotFound => AppError::NotFound(anyhow::anyhow!(e)),
            AccountError::Backend(e) => AppError::DatabaseError(e),
        }
    }
}

/// A signed-in account: the stored user plus a fresh session token.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    jwt: JwtService,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &Password,
    ) -> Result<Session, AccountError> {
        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let password_hash = hash_password(password).map_err(AccountError::Backend)?;
        let user = self
            .users
            .insert(User::new(name.trim().to_string(), email, password_hash))
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.session(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &Password) -> Result<Session, AccountError> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).map_err(AccountError::Backend)? {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.session(user)
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn profile(&self, identity: &Identity) -> Result<User, AccountError> {
        self.users
            .find_by_id(&identity.user_id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    /// Apply a partial update; fields left out keep their values.
    #[instrument(skip(self, identity, update), fields(user_id = %identity.user_id))]
    pub async fn update_profile(
        &self,
        identity: &Identity,
        update: ProfileUpdate,
    ) -> Result<User, AccountError> {
        let mut user = self.profile(identity).await?;
        user.apply_profile(&update);
        self.users.update(user).await?.ok_or(AccountError::NotFound)
    }

    fn session(&self, user: User) -> Result<Session, AccountError> {
        let token = self
            .jwt
            .generate_token(&user.id)
            .map_err(AccountError::Backend)?;
        Ok(Session { user, token })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
