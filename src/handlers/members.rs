// src/handlers/members.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{error::AppError, extract::JsonBody, response::ApiResponse},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::member::{AddMemberPayload, Member, MemberTarget},
};

// --- Projeto ---

// GET /api/projet/{id}/membres/
#[utoipa::path(
    get,
    path = "/api/projet/{id}/membres/",
    tag = "Membres",
    params(("id" = Uuid, Path, description = "ID do projeto")),
    responses(
        (status = 200, description = "Membros alocados", body = Vec<Member>),
        (status = 403, description = "Sem permissão ou fora do escopo")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_project_members(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Member>>>, AppError> {
    let members = app_state.member_service.list(&identity, MemberTarget::Project(id)).await?;
    Ok(Json(ApiResponse::ok("Dados recuperados com sucesso", members)))
}

// POST /api/projet/{id}/membres/
#[utoipa::path(
    post,
    path = "/api/projet/{id}/membres/",
    tag = "Membres",
    params(("id" = Uuid, Path, description = "ID do projeto")),
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Membro alocado; devolve a lista atualizada", body = Vec<Member>),
        (status = 409, description = "Usuário já é membro")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn add_project_member(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<AddMemberPayload>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Member>>>), AppError> {
    let members = app_state
        .member_service
        .add(&identity, MemberTarget::Project(id), payload.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Membro alocado com sucesso", members))))
}

// DELETE /api/projet/{id}/membres/{user_id}/
#[utoipa::path(
    delete,
    path = "/api/projet/{id}/membres/{user_id}/",
    tag = "Membres",
    params(
        ("id" = Uuid, Path, description = "ID do projeto"),
        ("user_id" = Uuid, Path, description = "ID do usuário")
    ),
    responses(
        (status = 204, description = "Membro removido"),
        (status = 404, description = "Usuário não é membro")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn remove_project_member(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    app_state
        .member_service
        .remove(&identity, MemberTarget::Project(id), user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Sous-projet ---

// GET /api/sous-projet/{id}/membres/
#[utoipa::path(
    get,
    path = "/api/sous-projet/{id}/membres/",
    tag = "Membres",
    params(("id" = Uuid, Path, description = "ID do sous-projet")),
    responses(
        (status = 200, description = "Membros alocados", body = Vec<Member>),
        (status = 403, description = "Sem permissão ou fora do escopo")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_sub_project_members(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Member>>>, AppError> {
    let members = app_state
        .member_service
        .list(&identity, MemberTarget::SubProject(id))
        .await?;
    Ok(Json(ApiResponse::ok("Dados recuperados com sucesso", members)))
}

// POST /api/sous-projet/{id}/membres/
#[utoipa::path(
    post,
    path = "/api/sous-projet/{id}/membres/",
    tag = "Membres",
    params(("id" = Uuid, Path, description = "ID do sous-projet")),
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Membro alocado; devolve a lista atualizada", body = Vec<Member>),
        (status = 409, description = "Usuário já é membro")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn add_sub_project_member(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<AddMemberPayload>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Member>>>), AppError> {
    let members = app_state
        .member_service
        .add(&identity, MemberTarget::SubProject(id), payload.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Membro alocado com sucesso", members))))
}

// DELETE /api/sous-projet/{id}/membres/{user_id}/
#[utoipa::path(
    delete,
    path = "/api/sous-projet/{id}/membres/{user_id}/",
    tag = "Membres",
    params(
        ("id" = Uuid, Path, description = "ID do sous-projet"),
        ("user_id" = Uuid, Path, description = "ID do usuário")
    ),
    responses(
        (status = 204, description = "Membro removido"),
        (status = 404, description = "Usuário não é membro")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn remove_sub_project_member(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    app_state
        .member_service
        .remove(&identity, MemberTarget::SubProject(id), user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
