// src/db/resource_repo.rs

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::{map_delete_error, map_write_error, AppError},
        pagination::PageRequest,
    },
    models::resource::{ChildSpan, DateWindow, Record, Resource, Scope, ScopeColumns, WindowSource},
};

/// Filtro das listagens: escopo do usuário + relação opcional.
#[derive(Debug, Clone, Copy)]
pub struct ListFilter<'a> {
    pub scope: &'a Scope,
    pub parent: Option<(&'static str, Uuid)>,
}

impl<'a> ListFilter<'a> {
    pub fn scoped(scope: &'a Scope) -> Self {
        Self { scope, parent: None }
    }
}

// Um só repositório para todos os recursos. Os nomes de tabela/coluna vêm de
// constantes dos tipos, nunca da requisição.
#[derive(Clone)]
pub struct ResourceRepository {
    pool: PgPool,
}

impl ResourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list<T: Resource>(
        &self,
        filter: &ListFilter<'_>,
        page: PageRequest,
    ) -> Result<Vec<T>, AppError> {
        let mut qb = select_query::<T>(filter, Some(page));
        let rows = qb.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // Versão sem paginação, usada pelo painel
    pub async fn list_all<T: Resource>(&self, filter: &ListFilter<'_>) -> Result<Vec<T>, AppError> {
        let mut qb = select_query::<T>(filter, None);
        let rows = qb.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn count<T: Resource>(&self, filter: &ListFilter<'_>) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", T::SOURCE));
        push_filters(&mut qb, filter, &T::SCOPE);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn sum<T: Resource>(
        &self,
        column: &'static str,
        filter: &ListFilter<'_>,
    ) -> Result<Decimal, AppError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT COALESCE(SUM({}), 0) FROM {}",
            column,
            T::SOURCE
        ));
        push_filters(&mut qb, filter, &T::SCOPE);
        let total = qb.build_query_scalar::<Decimal>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    pub async fn find<T: Resource>(&self, id: Uuid) -> Result<Option<T>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.find_in::<T>(&mut conn, id).await
    }

    pub async fn find_in<T: Resource>(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<T>, AppError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", T::SOURCE);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn insert<T: Resource>(
        &self,
        conn: &mut PgConnection,
        fields: T::Fields,
    ) -> Result<T, AppError> {
        let mut qb = insert_query::<T>(fields);
        let id = qb
            .build_query_scalar::<Uuid>()
            .fetch_one(&mut *conn)
            .await
            .map_err(map_write_error)?;

        self.find_in::<T>(conn, id).await?.ok_or(AppError::NotFound(T::LABEL))
    }

    pub async fn update<T: Resource>(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        fields: T::Fields,
    ) -> Result<T, AppError> {
        let mut qb = update_query::<T>(id, fields);
        let updated = qb
            .build_query_scalar::<Uuid>()
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_write_error)?
            .ok_or(AppError::NotFound(T::LABEL))?;

        self.find_in::<T>(conn, updated).await?.ok_or(AppError::NotFound(T::LABEL))
    }

    pub async fn delete<T: Resource>(&self, id: Uuid) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_delete_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// Janela de datas do projeto ou sous-projet pai.
    pub async fn window(&self, source: WindowSource) -> Result<Option<DateWindow>, AppError> {
        let (table, id) = match source {
            WindowSource::Project(id) => ("projects", id),
            WindowSource::SubProject(id) => ("sub_projects", id),
        };
        let sql = format!("SELECT start_date, end_date FROM {} WHERE id = $1", table);
        let window = sqlx::query_as::<_, DateWindow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(window)
    }

    /// Extremos dos sous-projets e faturas presos à janela de `source`.
    pub async fn child_span(&self, source: WindowSource) -> Result<ChildSpan, AppError> {
        let span = sqlx::query_as::<_, ChildSpan>(child_span_sql(source))
            .bind(source_id(source))
            .fetch_one(&self.pool)
            .await?;
        Ok(span)
    }

    /// Projeto dono de um sous-projet, marché ou AP.
    pub async fn owner_project(&self, table: &'static str, id: Uuid) -> Result<Option<Uuid>, AppError> {
        let sql = format!("SELECT project_id FROM {} WHERE id = $1", table);
        let owner = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }
}

fn source_id(source: WindowSource) -> Uuid {
    match source {
        WindowSource::Project(id) | WindowSource::SubProject(id) => id,
    }
}

// Fatura presa ao sous-projet conta só para ele; a do projeto, só sem sous-projet.
fn child_span_sql(source: WindowSource) -> &'static str {
    match source {
        WindowSource::Project(_) => {
            r#"
            SELECT
                (SELECT MIN(start_date) FROM sub_projects WHERE project_id = $1) AS first_start,
                (SELECT MAX(end_date) FROM sub_projects WHERE project_id = $1) AS last_end,
                (SELECT MIN(billing_date) FROM invoices
                 WHERE project_id = $1 AND sub_project_id IS NULL) AS first_billing
            "#
        }
        WindowSource::SubProject(_) => {
            r#"
            SELECT
                NULL::date AS first_start,
                NULL::date AS last_end,
                (SELECT MIN(billing_date) FROM invoices WHERE sub_project_id = $1) AS first_billing
            "#
        }
    }
}

// =============================================================================
//  MONTAGEM DAS QUERIES
// =============================================================================

fn select_query<T: Resource>(
    filter: &ListFilter<'_>,
    page: Option<PageRequest>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT * FROM {}", T::SOURCE));
    push_filters(&mut qb, filter, &T::SCOPE);
    qb.push(" ORDER BY ").push(T::ORDER_BY);
    if let Some(page) = page {
        qb.push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
    }
    qb
}

fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, filter: &ListFilter<'_>, columns: &ScopeColumns) {
    qb.push(" WHERE TRUE");
    if let Some((column, id)) = filter.parent {
        qb.push(" AND ").push(column).push(" = ").push_bind(id);
    }
    push_scope(qb, filter.scope, columns);
}

// (project_col = ANY($n) OR sub_project_col = ANY($m))
fn push_scope(qb: &mut QueryBuilder<'static, Postgres>, scope: &Scope, columns: &ScopeColumns) {
    let Scope::Assigned { projects, sub_projects } = scope else {
        return;
    };
    if columns.is_empty() {
        return;
    }

    qb.push(" AND (FALSE");
    if let Some(column) = columns.project {
        qb.push(" OR ")
            .push(column)
            .push(" = ANY(")
            .push_bind(projects.clone())
            .push(")");
    }
    if let Some(column) = columns.sub_project {
        qb.push(" OR ")
            .push(column)
            .push(" = ANY(")
            .push_bind(sub_projects.clone())
            .push(")");
    }
    qb.push(")");
}

fn insert_query<T: Resource>(fields: T::Fields) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES (",
        T::TABLE,
        <T::Fields as Record>::COLUMNS.join(", ")
    ));
    {
        let mut values = qb.separated(", ");
        fields.push_values(&mut values);
    }
    qb.push(") RETURNING id");
    qb
}

// SET (a, b) = ROW($1, $2) reaproveita a mesma lista de valores do INSERT.
fn update_query<T: Resource>(id: Uuid, fields: T::Fields) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "UPDATE {} SET ({}) = ROW(",
        T::TABLE,
        <T::Fields as Record>::COLUMNS.join(", ")
    ));
    {
        let mut values = qb.separated(", ");
        fields.push_values(&mut values);
    }
    qb.push("), updated_at = NOW() WHERE id = ")
        .push_bind(id)
        .push(" RETURNING id");
    qb
}
