// src/handlers/auth.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::{error::AppError, extract::JsonBody, response::MessageResponse},
    config::AppState,
    models::auth::{LoginPayload, RefreshPayload, SetPasswordPayload, TokenPair},
};

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Par de tokens (access + refresh)", body = TokenPair),
        (status = 400, description = "Dados inválidos"),
        (status = 401, description = "Credenciais inválidas ou conta inativa")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> Result<Json<TokenPair>, AppError> {
    payload.validate()?;

    let tokens = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;

    Ok(Json(tokens))
}

// POST /api/auth/refresh
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshPayload,
    responses(
        (status = 200, description = "Novo par de tokens", body = TokenPair),
        (status = 401, description = "Refresh inválido, expirado ou conta inativa")
    )
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshPayload>,
) -> Result<Json<TokenPair>, AppError> {
    let tokens = app_state.auth_service.refresh(&payload.refresh).await?;
    Ok(Json(tokens))
}

// POST /api/auth/set-password
#[utoipa::path(
    post,
    path = "/api/auth/set-password",
    tag = "Auth",
    request_body = SetPasswordPayload,
    responses(
        (status = 200, description = "Senha definida e conta ativada"),
        (status = 400, description = "Token inválido, expirado ou já usado")
    )
)]
pub async fn set_password(
    State(app_state): State<AppState>,
    JsonBody(payload): JsonBody<SetPasswordPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    app_state.auth_service.set_password(payload).await?;
    Ok(Json(MessageResponse::ok("Senha definida com sucesso")))
}
