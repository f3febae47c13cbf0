// src/handlers/dashboard.rs

use axum::{extract::State, Json};

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::dashboard::Dashboard,
};

// GET /api/dashboard/
#[utoipa::path(
    get,
    path = "/api/dashboard/",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Funcionário: `assignments`; demais papéis: `overview` com contagens e totais", body = Dashboard),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> Result<Json<ApiResponse<Dashboard>>, AppError> {
    let dashboard = app_state.dashboard_service.get(&identity).await?;
    Ok(Json(ApiResponse::ok("Painel recuperado com sucesso", dashboard)))
}
