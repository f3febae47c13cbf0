// src/services/storage.rs

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use uuid::Uuid;

use crate::common::error::AppError;

/// Pasta de destino dentro de MEDIA_ROOT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Pdfs,
    Images,
    Other,
}

impl Bucket {
    pub fn dir(&self) -> &'static str {
        match self {
            Bucket::Pdfs => "pdfs",
            Bucket::Images => "images",
            Bucket::Other => "other",
        }
    }

    /// Pasta de um caminho já gravado (`pdfs/<uuid>.pdf` -> Pdfs).
    pub fn of_stored(relative: &str) -> Bucket {
        match relative.split('/').next() {
            Some("pdfs") => Bucket::Pdfs,
            Some("images") => Bucket::Images,
            _ => Bucket::Other,
        }
    }
}

// content-type -> pasta. Tipos fora da tabela caem na extensão.
const CONTENT_TYPES: &[(&str, Bucket)] = &[
    ("application/pdf", Bucket::Pdfs),
    ("image/jpeg", Bucket::Images),
    ("image/jpg", Bucket::Images),
    ("image/png", Bucket::Images),
    ("image/gif", Bucket::Images),
];

const EXTENSIONS: &[(&str, Bucket)] = &[
    ("pdf", Bucket::Pdfs),
    ("jpg", Bucket::Images),
    ("jpeg", Bucket::Images),
    ("png", Bucket::Images),
    ("gif", Bucket::Images),
];

/// Um arquivo recebido no multipart, ainda em memória.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn bucket(&self) -> Bucket {
        let by_type = self.content_type.as_deref().and_then(|ct| {
            let essence = ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase();
            CONTENT_TYPES
                .iter()
                .find(|(known, _)| *known == essence)
                .map(|(_, bucket)| *bucket)
        });

        by_type
            .or_else(|| {
                let ext = self.extension()?;
                EXTENSIONS.iter().find(|(known, _)| *known == ext).map(|(_, bucket)| *bucket)
            })
            .unwrap_or(Bucket::Other)
    }
}

// Arquivos de documentos no disco, sob MEDIA_ROOT.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Grava com nome UUID e devolve o caminho relativo (ex.: `pdfs/<uuid>.pdf`).
    pub async fn save(&self, upload: &Upload) -> Result<String, AppError> {
        let bucket = upload.bucket();
        let file_name = match upload.extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let relative = format!("{}/{}", bucket.dir(), file_name);

        let dir = self.root.join(bucket.dir());
        tokio::fs::create_dir_all(&dir).await?;

        // Escreve num temporário e renomeia: ninguém vê arquivo pela metade
        let final_path = dir.join(&file_name);
        let tmp_path = dir.join(format!(".{}.tmp", file_name));
        if let Err(e) = tokio::fs::write(&tmp_path, &upload.bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp_path, &final_path).await?;

        tracing::debug!(path = %relative, size = upload.bytes.len(), "Arquivo gravado");
        Ok(relative)
    }

    /// Melhor esforço: falhas só vão para o log.
    pub async fn remove_all(&self, relative_paths: &[String]) {
        for relative in relative_paths {
            let Some(path) = self.resolve(relative) else {
                tracing::warn!(path = %relative, "Caminho de arquivo recusado");
                continue;
            };
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %relative, "Falha ao remover arquivo: {}", e);
            }
        }
    }

    // Caminhos vêm do banco, mas nunca saem de MEDIA_ROOT
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        let safe = path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        safe.then(|| self.root.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: Option<&str>) -> Upload {
        Upload {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from_static(b"%PDF-1.4"),
        }
    }

    #[test]
    fn content_type_wins_over_extension() {
        assert_eq!(upload("scan.bin", Some("application/pdf")).bucket(), Bucket::Pdfs);
        assert_eq!(upload("foto.PNG", Some("image/png; charset=binary")).bucket(), Bucket::Images);
    }

    #[test]
    fn unknown_content_type_falls_back_to_extension() {
        assert_eq!(upload("Plan.PDF", Some("application/octet-stream")).bucket(), Bucket::Pdfs);
        assert_eq!(upload("foto.jpeg", None).bucket(), Bucket::Images);
        assert_eq!(upload("planilha.xlsx", None).bucket(), Bucket::Other);
        assert_eq!(upload("sem_extensao", None).bucket(), Bucket::Other);
    }

    #[test]
    fn stored_path_prefix_gives_the_bucket() {
        assert_eq!(Bucket::of_stored("pdfs/1.pdf"), Bucket::Pdfs);
        assert_eq!(Bucket::of_stored("images/2.png"), Bucket::Images);
        assert_eq!(Bucket::of_stored("other/3.xlsx"), Bucket::Other);
        assert_eq!(Bucket::of_stored("4.pdf"), Bucket::Other);
    }

    #[test]
    fn paths_outside_media_root_are_refused() {
        let storage = MediaStorage::new("/srv/media");
        assert_eq!(storage.resolve("pdfs/a.pdf"), Some(PathBuf::from("/srv/media/pdfs/a.pdf")));
        assert!(storage.resolve("../etc/passwd").is_none());
        assert!(storage.resolve("/etc/passwd").is_none());
    }

    #[tokio::test]
    async fn save_writes_under_bucket_and_remove_cleans_up() {
        let root = std::env::temp_dir().join(format!("projets-media-{}", Uuid::new_v4()));
        let storage = MediaStorage::new(&root);

        let relative = storage.save(&upload("Plan.pdf", Some("application/pdf"))).await.unwrap();
        assert!(relative.starts_with("pdfs/"));
        assert!(relative.ends_with(".pdf"));
        assert!(root.join(&relative).exists());

        storage.remove_all(std::slice::from_ref(&relative)).await;
        assert!(!root.join(&relative).exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
