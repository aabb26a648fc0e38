use crate::dtos::auth::{
    AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, UserProfile,
};
use crate::middleware::AuthUser;
use crate::services::Session;
use crate::startup::AppState;
use crate::utils::{JsonBody, Password, ValidatedJson};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = Password::new(req.password.unwrap_or_default());
    let session = state
        .accounts
        .register(
            &req.name.unwrap_or_default(),
            &req.email.unwrap_or_default(),
            &password,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(auth_response(session))))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = Password::new(req.password.unwrap_or_default());
    let session = state
        .accounts
        .login(&req.email.unwrap_or_default(), &password)
        .await?;

    Ok(Json(auth_response(session)))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state.accounts.profile(&identity).await?;
    Ok(Json(UserProfile::from(user)))
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .accounts
        .update_profile(&identity, req.into())
        .await?;
    Ok(Json(UserProfile::from(user)))
}

fn auth_response(session: Session) -> AuthResponse {
    AuthResponse {
        profile: session.user.into(),
        token: session.token,
    }
}
