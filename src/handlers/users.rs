// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        extract::{JsonBody, QueryParams},
        pagination::{PageParams, PageRequest, Paginated},
        response::{ApiResponse, MessageResponse},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{CanCreate, CanUpdate, RequireAccess, Users},
    },
    models::auth::{CreateUserPayload, DeviceTokenPayload, UpdateUserPayload, User},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserQuery {
    /// Busca por nome ou e-mail
    pub search: Option<String>,
    pub page: Option<u32>,
    #[serde(alias = "per_page")]
    pub page_size: Option<u32>,
}

// GET /api/users/
#[utoipa::path(
    get,
    path = "/api/users/",
    tag = "Users",
    params(UserQuery),
    responses(
        (status = 200, description = "Usuários ativos, paginados", body = Vec<User>),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    QueryParams(query): QueryParams<UserQuery>,
    uri: Uri,
) -> Result<Json<Paginated<User>>, AppError> {
    let page = PageRequest::from(&PageParams { page: query.page, page_size: query.page_size });
    let (users, count) = app_state
        .user_service
        .list(&identity, query.search.as_deref(), page)
        .await?;
    Ok(Json(Paginated::new(page, count, users, &uri)))
}

// GET /api/users/{id}/
#[utoipa::path(
    get,
    path = "/api/users/{id}/",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário", body = User),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = app_state.user_service.get(&identity, id).await?;
    Ok(Json(ApiResponse::ok("Dados recuperados com sucesso", user)))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/users/me/",
    tag = "Users",
    responses(
        (status = 200, description = "Dados do usuário logado", body = User),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = app_state.user_service.me(&identity).await?;
    Ok(Json(ApiResponse::ok("Dados recuperados com sucesso", user)))
}

// POST /api/users/
#[utoipa::path(
    post,
    path = "/api/users/",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Usuário criado; link de definição de senha enviado", body = User),
        (status = 403, description = "Somente administradores"),
        (status = 409, description = "E-mail ou telefone já cadastrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    _guard: RequireAccess<Users, CanCreate>,
    JsonBody(payload): JsonBody<CreateUserPayload>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), AppError> {
    let user = app_state.user_service.create(&identity, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Usuário criado com sucesso", user)),
    ))
}

// PUT /api/users/{id}/
#[utoipa::path(
    put,
    path = "/api/users/{id}/",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "Usuário atualizado", body = User),
        (status = 403, description = "Somente administradores"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    _guard: RequireAccess<Users, CanUpdate>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<UpdateUserPayload>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = app_state.user_service.update(&identity, id, payload).await?;
    Ok(Json(ApiResponse::ok("Usuário atualizado com sucesso", user)))
}

// DELETE /api/users/{id}/
#[utoipa::path(
    delete,
    path = "/api/users/{id}/",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 204, description = "Usuário desativado"),
        (status = 403, description = "Somente administradores"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn delete_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.user_service.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/users/me/device-token/
#[utoipa::path(
    put,
    path = "/api/users/me/device-token/",
    tag = "Users",
    request_body = DeviceTokenPayload,
    responses(
        (status = 200, description = "Token de push registrado"),
        (status = 400, description = "Token inválido")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn set_device_token(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    JsonBody(payload): JsonBody<DeviceTokenPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;
    app_state.user_service.set_device_token(&identity, payload.token.trim()).await?;
    Ok(Json(MessageResponse::ok("Token de dispositivo registrado")))
}
