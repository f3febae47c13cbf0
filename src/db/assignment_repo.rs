// src/db/assignment_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::{map_write_error, AppError},
    models::member::{Member, MemberTarget},
};

// Alocações (project_members) e tudo que deriva delas: visibilidade e destinatários.
#[derive(Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Projetos que o usuário chefia ou em que está alocado
    pub async fn visible_projects(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM projects WHERE lead_id = $1
            UNION
            SELECT project_id FROM project_members
            WHERE user_id = $1 AND project_id IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    // Sous-projets que chefia, dos projetos que chefia, ou em que está alocado
    pub async fn visible_sub_projects(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM sub_projects WHERE lead_id = $1
            UNION
            SELECT s.id FROM sub_projects s
            JOIN projects p ON p.id = s.project_id
            WHERE p.lead_id = $1
            UNION
            SELECT sub_project_id FROM project_members
            WHERE user_id = $1 AND sub_project_id IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn list_members(&self, target: MemberTarget) -> Result<Vec<Member>, AppError> {
        let (column, id) = target_column(target);
        let sql = format!(
            r#"
            SELECT u.id AS user_id, u.full_name, u.email, u.role, m.created_at
            FROM project_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.{} = $1
            ORDER BY u.full_name
            "#,
            column
        );
        let members = sqlx::query_as::<_, Member>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    pub async fn add_member(&self, target: MemberTarget, user_id: Uuid) -> Result<(), AppError> {
        let (column, id) = target_column(target);
        let sql = format!("INSERT INTO project_members (user_id, {}) VALUES ($1, $2)", column);
        sqlx::query(&sql)
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    pub async fn remove_member(&self, target: MemberTarget, user_id: Uuid) -> Result<bool, AppError> {
        let (column, id) = target_column(target);
        let sql = format!("DELETE FROM project_members WHERE user_id = $1 AND {} = $2", column);
        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Destinatários de notificações ---

    pub async fn admin_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE role = 'ADMIN' AND is_active")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    // Chefe do projeto + membros alocados
    pub async fn project_staff(&self, project_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT lead_id FROM projects WHERE id = $1 AND lead_id IS NOT NULL
            UNION
            SELECT user_id FROM project_members WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

fn target_column(target: MemberTarget) -> (&'static str, Uuid) {
    match target {
        MemberTarget::Project(id) => ("project_id", id),
        MemberTarget::SubProject(id) => ("sub_project_id", id),
    }
}
