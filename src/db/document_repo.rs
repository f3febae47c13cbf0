// src/db/document_repo.rs

use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::common::error::AppError;

// Arquivos de um documento. A linha do documento em si passa pelo ResourceRepository.
#[derive(Clone, Default)]
pub struct DocumentRepository;

impl DocumentRepository {
    pub fn new() -> Self {
        Self
    }

    // Roda dentro da mesma transação que criou o documento
    pub async fn attach_files(
        &self,
        conn: &mut PgConnection,
        document_id: Uuid,
        paths: &[String],
    ) -> Result<(), AppError> {
        if paths.is_empty() {
            return Ok(());
        }

        let mut qb = files_query(document_id, paths);
        qb.build().execute(&mut *conn).await?;
        Ok(())
    }
}

fn files_query(document_id: Uuid, paths: &[String]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("INSERT INTO document_files (document_id, path) ");
    qb.push_values(paths, |mut row, path| {
        row.push_bind(document_id).push_bind(path.clone());
    });
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_insert_lists_one_tuple_per_file() {
        let paths = vec!["pdfs/a.pdf".to_string(), "images/b.png".to_string()];
        let qb = files_query(Uuid::new_v4(), &paths);

        assert_eq!(
            qb.sql(),
            "INSERT INTO document_files (document_id, path) VALUES ($1, $2), ($3, $4)"
        );
    }
}
