// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::{map_write_error, AppError},
        pagination::PageRequest,
    },
    models::auth::{Role, User},
};

/// Alterações parciais de um usuário; `None` mantém o valor atual.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // Busca um usuário pelo seu e-mail
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Listagem dos ativos, com busca opcional em nome/e-mail
    pub async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE is_active AND deleted_at IS NULL
              AND ($1::text IS NULL OR full_name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%')
            ORDER BY full_name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn count(&self, search: Option<&str>) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE is_active AND deleted_at IS NULL
              AND ($1::text IS NULL OR full_name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%')
            "#,
        )
        .bind(search)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // Cria um usuário sem senha. Ele só fica ativo depois de definir a senha.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        full_name: &str,
        email: &str,
        role: Role,
        phone: Option<&str>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, role, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(full_name)
        .bind(email)
        .bind(role)
        .bind(phone)
        .fetch_one(executor)
        .await
        .map_err(map_write_error)?;
        Ok(user)
    }

    pub async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name     = COALESCE($2, full_name),
                email         = COALESCE($3, email),
                role          = COALESCE($4, role),
                phone         = COALESCE($5, phone),
                password_hash = COALESCE($6, password_hash),
                is_active     = COALESCE($7, is_active),
                updated_at    = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.full_name)
        .bind(changes.email)
        .bind(changes.role)
        .bind(changes.phone)
        .bind(changes.password_hash)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(user)
    }

    // Definir a senha também ativa a conta. Conta excluída não volta.
    pub async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, is_active = TRUE, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Exclusão lógica: as linhas que apontam para o usuário continuam válidas.
    // Vale também para contas pendentes (ainda sem senha).
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE, deleted_at = NOW(), device_token = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_device_token(&self, id: Uuid, token: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET device_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Cria o primeiro administrador, só quando ainda não existe nenhum.
    pub async fn ensure_admin(
        &self,
        full_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (full_name, email, role, password_hash, is_active)
            SELECT $1, $2, 'ADMIN'::user_role, $3, TRUE
            WHERE NOT EXISTS (SELECT 1 FROM users WHERE role = 'ADMIN')
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(full_name)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
