// src/handlers/documents.rs

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    common::{error::AppError, extract::JsonBody, response::ApiResponse},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{CanCreate, CanUpdate, RequireAccess},
    },
    models::document::{Document, DocumentFields},
    services::storage::Upload,
};

// Campos de texto aceitos no multipart
const TEXT_FIELDS: &[&str] = &["titre", "type", "description", "id_projet", "id_sous_projet", "date_ajout"];

// POST /api/document/
#[utoipa::path(
    post,
    path = "/api/document/",
    tag = "Documents",
    request_body(
        content_type = "multipart/form-data",
        description = "titre, type, description, id_projet, id_sous_projet, date_ajout + um ou mais `files`"
    ),
    responses(
        (status = 201, description = "Documento criado com os arquivos", body = Document),
        (status = 400, description = "Campos inválidos ou arquivo incompatível com o tipo"),
        (status = 403, description = "Sem permissão ou fora do escopo")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn upload(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    _guard: RequireAccess<Document, CanCreate>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Document>>), AppError> {
    let mut form = Map::new();
    let mut uploads = Vec::new();

    // 1. Lê as partes
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Multipart inválido: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "files" || field.file_name().is_some() {
            let file_name = field.file_name().unwrap_or("arquivo").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Falha ao ler arquivo: {}", e.body_text())))?;
            uploads.push(Upload { file_name, content_type, bytes });
        } else if TEXT_FIELDS.contains(&name.as_str()) {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Campo inválido: {}", e.body_text())))?;
            // Campo vazio = ausente (ex.: id_sous_projet não informado)
            if !text.trim().is_empty() {
                form.insert(name, Value::String(text.trim().to_string()));
            }
        }
    }

    if uploads.is_empty() {
        return Err(AppError::field("files", "required", "Envie pelo menos um arquivo."));
    }

    // 2. Campos de texto -> DocumentFields
    let fields: DocumentFields = serde_json::from_value(Value::Object(form))
        .map_err(|e| AppError::InvalidInput(format!("Dados inválidos: {}", e)))?;

    // 3. Grava
    let document = app_state.document_service.create(&identity, fields, uploads).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Documento adicionado com sucesso", document)),
    ))
}

// PUT /api/document/{id}/ (parcial, só metadados)
pub async fn update(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    _guard: RequireAccess<Document, CanUpdate>,
    Path(id): Path<Uuid>,
    JsonBody(patch): JsonBody<Value>,
) -> Result<Json<ApiResponse<Document>>, AppError> {
    let document = app_state.document_service.update(&identity, id, patch).await?;
    Ok(Json(ApiResponse::ok("Documento atualizado com sucesso", document)))
}

// DELETE /api/document/{id}/
#[utoipa::path(
    delete,
    path = "/api/document/{id}/",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "ID do documento")),
    responses(
        (status = 204, description = "Documento e arquivos removidos"),
        (status = 403, description = "Sem permissão ou fora do escopo"),
        (status = 404, description = "Documento não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn remove(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.document_service.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
