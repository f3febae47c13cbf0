// src/models/document.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{query_builder::Separated, FromRow, Postgres};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::resource::{
        require_parent, DateWindow, Parent, Record, Resource, ResourceKind, ScopeColumns,
        ScopeKeys,
    },
};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct DocumentFields {
    #[serde(rename = "titre")]
    #[validate(length(min = 1, max = 100, message = "O título deve ter entre 1 e 100 caracteres."))]
    pub title: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 30, message = "O tipo deve ter entre 1 e 30 caracteres."))]
    #[schema(example = "pdf")]
    pub doc_type: String,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,

    #[serde(rename = "date_ajout", default = "today")]
    pub uploaded_on: NaiveDate,

    #[serde(rename = "id_projet", default)]
    pub project_id: Option<Uuid>,

    #[serde(rename = "id_sous_projet", default)]
    pub sub_project_id: Option<Uuid>,
}

/// Documento declarado como PDF só aceita arquivos PDF.
pub fn is_pdf_type(doc_type: &str) -> bool {
    doc_type.trim().eq_ignore_ascii_case("pdf")
}

impl DocumentFields {
    pub fn expects_pdf(&self) -> bool {
        is_pdf_type(&self.doc_type)
    }
}

impl Record for DocumentFields {
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "doc_type",
        "description",
        "uploaded_on",
        "project_id",
        "sub_project_id",
    ];

    fn push_values<'args>(self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.title)
            .push_bind(self.doc_type)
            .push_bind(self.description)
            .push_bind(self.uploaded_on)
            .push_bind(self.project_id)
            .push_bind(self.sub_project_id);
    }

    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys { project: self.project_id, sub_project: self.sub_project_id }
    }

    fn check(&self, _window: Option<&DateWindow>) -> Result<(), AppError> {
        require_parent(self.project_id, self.sub_project_id)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Document {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: DocumentFields,
    // Caminhos relativos dentro de MEDIA_ROOT
    #[sqlx(default)]
    #[serde(rename = "fichiers")]
    pub files: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Document {
    type Fields = DocumentFields;

    const KIND: ResourceKind = ResourceKind::Document;
    const LABEL: &'static str = "Documento";
    const TABLE: &'static str = "documents";
    const SOURCE: &'static str = "document_overview";
    const SCOPE: ScopeColumns = ScopeColumns::both("project_id", "sub_project_id");
    const ORDER_BY: &'static str = "uploaded_on DESC, created_at DESC";
    const PARENTS: &'static [Parent] = &[
        Parent { segment: "projet", column: "project_id" },
        Parent { segment: "sous-projet", column: "sub_project_id" },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn fields(&self) -> &DocumentFields {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_date_defaults_to_today() {
        let fields: DocumentFields = serde_json::from_value(serde_json::json!({
            "titre": "Plan",
            "type": "PDF",
            "id_projet": Uuid::new_v4()
        }))
        .unwrap();

        assert_eq!(fields.uploaded_on, today());
        assert!(fields.expects_pdf());
        assert!(fields.check(None).is_ok());
    }

    #[test]
    fn document_needs_a_parent() {
        let fields: DocumentFields = serde_json::from_value(serde_json::json!({
            "titre": "Plan",
            "type": "image"
        }))
        .unwrap();

        assert!(!fields.expects_pdf());
        assert!(fields.check(None).is_err());
    }
}
