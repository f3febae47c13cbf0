// src/services/document_service.rs

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::DocumentRepository,
    models::{
        auth::Identity,
        document::{is_pdf_type, Document, DocumentFields},
        resource::{Action, ResourceKind},
    },
    services::{
        rbac_service::authorize,
        resource_service::ResourceService,
        storage::{Bucket, MediaStorage, Upload},
    },
};

// Documento + arquivos. Metadados seguem o CRUD genérico; aqui ficam upload, edição e remoção.
#[derive(Clone)]
pub struct DocumentService {
    pool: PgPool,
    resources: ResourceService,
    files: DocumentRepository,
    storage: MediaStorage,
}

impl DocumentService {
    pub fn new(pool: PgPool, resources: ResourceService, files: DocumentRepository, storage: MediaStorage) -> Self {
        Self { pool, resources, files, storage }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        fields: DocumentFields,
        uploads: Vec<Upload>,
    ) -> Result<Document, AppError> {
        // 1. Permissão, escopo e validação: antes de tocar no disco
        let fields = self.resources.prepare_create::<Document>(identity, fields).await?;
        check_uploads(&fields, &uploads)?;

        // 2. Disco
        let mut saved = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            match self.storage.save(upload).await {
                Ok(path) => saved.push(path),
                Err(e) => {
                    self.storage.remove_all(&saved).await;
                    return Err(e);
                }
            }
        }

        // 3. Banco, numa transação só
        match self.persist(fields, &saved).await {
            Ok(document) => {
                tracing::info!(
                    id = %document.id,
                    files = document.files.len(),
                    user = %identity.user_id,
                    "✅ Documento criado"
                );
                Ok(document)
            }
            Err(e) => {
                // Nada pode ficar órfão no disco
                self.storage.remove_all(&saved).await;
                Err(e)
            }
        }
    }

    /// Edição parcial dos metadados. Passar a `pdf` exige que os arquivos já gravados sejam PDF.
    pub async fn update(&self, identity: &Identity, id: Uuid, patch: Value) -> Result<Document, AppError> {
        authorize(identity, ResourceKind::Document, Action::Update)?;

        let current = self.resources.get::<Document>(identity, id).await?;
        let next_type = match patch.get("type") {
            Some(Value::String(doc_type)) => doc_type.as_str(),
            _ => current.fields.doc_type.as_str(),
        };
        check_stored_files(next_type, &current.files)?;

        self.resources.update::<Document>(identity, id, patch).await
    }

    /// Remove a linha (os arquivos caem em cascata) e depois os arquivos do disco.
    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<(), AppError> {
        let removed = self.resources.delete::<Document>(identity, id).await?;
        self.storage.remove_all(&removed.files).await;
        Ok(())
    }

    async fn persist(&self, fields: DocumentFields, paths: &[String]) -> Result<Document, AppError> {
        let repo = self.resources.repo();
        let mut tx = self.pool.begin().await?;

        let document = repo.insert::<Document>(&mut *tx, fields).await?;
        self.files.attach_files(&mut *tx, document.id, paths).await?;

        // Relê pela view para devolver a lista de arquivos
        let document = repo
            .find_in::<Document>(&mut *tx, document.id)
            .await?
            .ok_or(AppError::NotFound("Documento"))?;

        tx.commit().await?;
        Ok(document)
    }
}

fn check_uploads(fields: &DocumentFields, uploads: &[Upload]) -> Result<(), AppError> {
    if fields.expects_pdf() && uploads.iter().any(|u| u.bucket() != Bucket::Pdfs) {
        return Err(AppError::field(
            "files",
            "pdf_only",
            "Documentos do tipo pdf só aceitam arquivos PDF.",
        ));
    }
    Ok(())
}

fn check_stored_files(doc_type: &str, files: &[String]) -> Result<(), AppError> {
    if is_pdf_type(doc_type) && files.iter().any(|path| Bucket::of_stored(path) != Bucket::Pdfs) {
        return Err(AppError::field(
            "type",
            "pdf_only",
            "O documento tem arquivos que não são PDF.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn fields(doc_type: &str) -> DocumentFields {
        serde_json::from_value(serde_json::json!({
            "titre": "Plan de masse",
            "type": doc_type,
            "id_projet": Uuid::new_v4()
        }))
        .unwrap()
    }

    fn upload(name: &str, content_type: &str) -> Upload {
        Upload {
            file_name: name.into(),
            content_type: Some(content_type.into()),
            bytes: Bytes::from_static(b"..."),
        }
    }

    #[test]
    fn pdf_document_rejects_images() {
        let uploads = vec![upload("a.pdf", "application/pdf"), upload("b.png", "image/png")];
        let err = check_uploads(&fields("pdf"), &uploads).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn pdf_document_accepts_pdfs_and_other_types_accept_anything() {
        let pdfs = vec![upload("a.pdf", "application/pdf"), upload("b.PDF", "application/octet-stream")];
        assert!(check_uploads(&fields("PDF"), &pdfs).is_ok());

        let mixed = vec![upload("a.pdf", "application/pdf"), upload("b.png", "image/png")];
        assert!(check_uploads(&fields("rapport"), &mixed).is_ok());
    }

    #[test]
    fn retyping_to_pdf_is_refused_when_stored_files_are_images() {
        let stored = vec!["pdfs/a.pdf".to_string(), "images/b.png".to_string()];
        let err = check_stored_files("pdf", &stored).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        assert!(check_stored_files(" PDF ", &["pdfs/a.pdf".to_string()]).is_ok());
        assert!(check_stored_files("photo", &stored).is_ok());
    }
}
