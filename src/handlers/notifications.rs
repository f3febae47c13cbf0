// src/handlers/notifications.rs

use axum::{
    extract::{Path, State},
    http::Uri,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        extract::QueryParams,
        pagination::{PageParams, PageRequest, Paginated},
        response::ApiResponse,
    },
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::notification::Notification,
};

// GET /api/notifications/
#[utoipa::path(
    get,
    path = "/api/notifications/",
    tag = "Notifications",
    params(PageParams),
    responses(
        (status = 200, description = "Notificações do usuário, mais recentes primeiro", body = Vec<Notification>),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    QueryParams(params): QueryParams<PageParams>,
    uri: Uri,
) -> Result<Json<Paginated<Notification>>, AppError> {
    let page = PageRequest::from(&params);
    let (rows, count) = app_state.notifications.list(&identity, page).await?;
    Ok(Json(Paginated::new(page, count, rows, &uri)))
}

// PUT /api/notifications/{id}/read/
#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read/",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "ID da notificação")),
    responses(
        (status = 200, description = "Notificação marcada como lida", body = Notification),
        (status = 404, description = "Notificação não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn mark_read(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Notification>>, AppError> {
    let notification = app_state.notifications.mark_read(&identity, id).await?;
    Ok(Json(ApiResponse::ok("Notificação marcada como lida", notification)))
}

// PUT /api/notifications/read-all/
#[utoipa::path(
    put,
    path = "/api/notifications/read-all/",
    tag = "Notifications",
    responses(
        (status = 200, description = "Todas marcadas como lidas; `data.updated` traz a quantidade")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn mark_all_read(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let updated = app_state.notifications.mark_all_read(&identity).await?;
    Ok(Json(ApiResponse::ok(
        "Todas as notificações foram marcadas como lidas",
        json!({ "updated": updated }),
    )))
}
