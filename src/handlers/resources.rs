// src/handlers/resources.rs

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        extract::{JsonBody, QueryParams},
        pagination::{PageParams, PageRequest, Paginated},
        response::ApiResponse,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{CanCreate, CanUpdate, RequireAccess},
    },
    models::resource::Resource,
};

// Os mesmos handlers servem todos os recursos; `T` escolhe tabela, regras e escopo.

// GET /api/<base>/
pub async fn list<T: Resource>(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    QueryParams(params): QueryParams<PageParams>,
    uri: Uri,
) -> Result<Json<Paginated<T>>, AppError> {
    let page = PageRequest::from(&params);
    let (rows, count) = app_state.resource_service.list::<T>(&identity, None, page).await?;
    Ok(Json(Paginated::new(page, count, rows, &uri)))
}

// GET /api/<base>/<parent>/{parent_id}/
async fn list_by_parent<T: Resource>(
    column: &'static str,
    app_state: AppState,
    identity: AuthenticatedUser,
    parent_id: Uuid,
    params: PageParams,
    uri: Uri,
) -> Result<Json<Paginated<T>>, AppError> {
    let page = PageRequest::from(&params);
    let (rows, count) = app_state
        .resource_service
        .list::<T>(&identity.0, Some((column, parent_id)), page)
        .await?;
    Ok(Json(Paginated::new(page, count, rows, &uri)))
}

// GET /api/<base>/{id}/
pub async fn detail<T: Resource>(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<T>>, AppError> {
    let row = app_state.resource_service.get::<T>(&identity, id).await?;
    Ok(Json(ApiResponse::ok("Dados recuperados com sucesso", row)))
}

// POST /api/<base>/
pub async fn create<T: Resource>(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    _guard: RequireAccess<T, CanCreate>,
    JsonBody(fields): JsonBody<T::Fields>,
) -> Result<(StatusCode, Json<ApiResponse<T>>), AppError> {
    let created = app_state.resource_service.create::<T>(&identity, fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(format!("{} criado com sucesso", T::LABEL), created)),
    ))
}

// PUT /api/<base>/{id}/ (parcial)
pub async fn update<T: Resource>(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    _guard: RequireAccess<T, CanUpdate>,
    Path(id): Path<Uuid>,
    JsonBody(patch): JsonBody<Value>,
) -> Result<Json<ApiResponse<T>>, AppError> {
    let updated = app_state.resource_service.update::<T>(&identity, id, patch).await?;
    Ok(Json(ApiResponse::ok(format!("{} atualizado com sucesso", T::LABEL), updated)))
}

// DELETE /api/<base>/{id}/
pub async fn remove<T: Resource>(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.resource_service.delete::<T>(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// CRUD completo + uma listagem por pai declarado em `T::PARENTS`.
pub fn routes<T: Resource>(base: &str) -> Router<AppState> {
    let router = Router::new()
        .route(&format!("/api/{}/", base), get(list::<T>).post(create::<T>))
        .route(
            &format!("/api/{}/{{id}}/", base),
            get(detail::<T>).put(update::<T>).delete(remove::<T>),
        );
    with_parent_lists::<T>(router, base)
}

pub fn with_parent_lists<T: Resource>(mut router: Router<AppState>, base: &str) -> Router<AppState> {
    for parent in T::PARENTS {
        let column = parent.column;
        router = router.route(
            &format!("/api/{}/{}/{{parent_id}}/", base, parent.segment),
            get(
                move |State(app_state): State<AppState>,
                      identity: AuthenticatedUser,
                      Path(parent_id): Path<Uuid>,
                      QueryParams(params): QueryParams<PageParams>,
                      uri: Uri| async move {
                    list_by_parent::<T>(column, app_state, identity, parent_id, params, uri).await
                },
            ),
        );
    }
    router
}
