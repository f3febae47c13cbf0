// src/common/error.rs

use std::borrow::Cow;
use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

// A taxonomia de erros da API. Cada variante vira um status + um `code` estável.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    #[error("Dados inválidos: {0}")]
    InvalidInput(String),

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Acesso negado")]
    Forbidden,

    #[error("Conflito de unicidade: {0}")]
    Conflict(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Token inválido ou expirado")]
    InvalidOrExpiredToken,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro de arquivo: {0}")]
    StorageError(#[from] std::io::Error),
}

impl AppError {
    /// Erro de regra de negócio preso a um campo, no mesmo formato do `validator`.
    pub fn field(field: &'static str, code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        let mut error = ValidationError::new(code);
        error.message = Some(message.into());
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        AppError::ValidationError(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) | AppError::InvalidOrExpiredToken => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidCredentials | AppError::InvalidToken => "unauthorized",
            AppError::InvalidOrExpiredToken => "invalid_or_expired",
            _ => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, errors) = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(m) => m.to_string(),
                            None => e.code.to_string(),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ("Um ou mais campos são inválidos.".to_string(), Some(details))
            }
            AppError::InvalidInput(msg) => (msg.clone(), None),
            AppError::NotFound(what) => (format!("{} não encontrado.", what), None),
            AppError::Forbidden => ("Você não tem permissão para realizar esta ação.".to_string(), None),
            AppError::Conflict(what) => (format!("Valor já está em uso: {}.", what), None),
            AppError::InvalidCredentials => ("E-mail ou senha inválidos.".to_string(), None),
            AppError::InvalidToken => ("Token de autenticação inválido ou ausente.".to_string(), None),
            AppError::InvalidOrExpiredToken => ("Token inválido ou expirado.".to_string(), None),

            // Todo o resto vira 500. O detalhe fica só no log.
            e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                ("Ocorreu um erro inesperado.".to_string(), None)
            }
        };

        let mut body = json!({
            "success": false,
            "code": code,
            "message": message,
        });
        if let Some(errors) = errors {
            body["errors"] = json!(errors);
        }

        (status, Json(body)).into_response()
    }
}

/// Traduz erros de escrita do Postgres para a taxonomia da API.
pub fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique");
            return AppError::Conflict(constraint_label(constraint).to_string());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::InvalidInput("Registro relacionado inexistente.".to_string());
        }
        if db_err.is_check_violation() {
            return AppError::InvalidInput("Os dados violam uma regra de integridade.".to_string());
        }
    }
    e.into()
}

/// Na exclusão, uma FK violada significa que ainda existem dependentes.
pub fn map_delete_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return AppError::Conflict("registros dependentes".to_string());
        }
    }
    e.into()
}

fn constraint_label(constraint: &str) -> &str {
    match constraint {
        "users_email_key" => "email",
        "users_phone_key" => "telephone",
        "meetings_minutes_number_key" => "numero_pv",
        "project_members_project_key" | "project_members_sub_project_key" => "membre",
        other => other,
    }
}
