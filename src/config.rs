// src/config.rs

use std::{path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{AssignmentRepository, DocumentRepository, NotificationRepository, ResourceRepository, UserRepository},
    models::resource::WorkflowMode,
    services::{
        auth::{AuthService, TokenTtl},
        dashboard_service::DashboardService,
        document_service::DocumentService,
        mailer::{HttpMailer, LogMailer, Mailer},
        member_service::MemberService,
        notification_service::{
            HttpPushClient, NoopPushClient, NotificationDispatcher, NotificationInbox, PgNotificationStore,
            PushClient,
        },
        rbac_service::AccessService,
        resource_service::ResourceService,
        setup_token::SetupTokenStore,
        storage::MediaStorage,
        user_service::UserService,
    },
};

/// Primeiro administrador, criado na subida se ainda não houver nenhum.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub name: String,
    pub email: String,
    pub password: String,
}

// Tudo que vem do ambiente (ou do .env)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub media_root: PathBuf,
    pub max_upload_mb: usize,
    pub frontend_url: String,
    pub push_api_url: Option<String>,
    pub push_api_key: Option<String>,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub workflow: WorkflowMode,
    pub admin: Option<AdminBootstrap>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let required = |key: &str| get(key).with_context(|| format!("{} deve ser definida", key));

        fn parsed<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
        where
            T: FromStr,
            T::Err: std::fmt::Display,
        {
            match value {
                Some(raw) => raw
                    .parse::<T>()
                    .map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", key, raw, e)),
                None => Ok(default),
            }
        }

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                name: get("ADMIN_NAME").unwrap_or_else(|| "Administrateur".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: parsed(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
            access_token_minutes: parsed(get("ACCESS_TOKEN_MINUTES"), "ACCESS_TOKEN_MINUTES", 60)?,
            refresh_token_days: parsed(get("REFRESH_TOKEN_DAYS"), "REFRESH_TOKEN_DAYS", 7)?,
            media_root: get("MEDIA_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./media")),
            max_upload_mb: parsed(get("MAX_UPLOAD_MB"), "MAX_UPLOAD_MB", 20)?,
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".to_string()),
            push_api_url: get("PUSH_API_URL"),
            push_api_key: get("PUSH_API_KEY"),
            mail_api_url: get("MAIL_API_URL"),
            mail_api_key: get("MAIL_API_KEY"),
            workflow: parsed(get("STATUS_WORKFLOW"), "STATUS_WORKFLOW", WorkflowMode::Open)?,
            admin,
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub resource_service: ResourceService,
    pub member_service: MemberService,
    pub dashboard_service: DashboardService,
    pub document_service: DocumentService,
    pub notifications: NotificationInbox,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(db_pool: PgPool, config: Config) -> Self {
        // 1. Repositórios
        let user_repo = UserRepository::new(db_pool.clone());
        let resource_repo = ResourceRepository::new(db_pool.clone());
        let assignment_repo = AssignmentRepository::new(db_pool.clone());
        let notification_repo = NotificationRepository::new(db_pool.clone());

        // 2. Adaptadores externos
        let push: Arc<dyn PushClient> = match &config.push_api_url {
            Some(url) => Arc::new(HttpPushClient::new(url.clone(), config.push_api_key.clone())),
            None => Arc::new(NoopPushClient),
        };
        let mailer: Arc<dyn Mailer> = match &config.mail_api_url {
            Some(url) => Arc::new(HttpMailer::new(url.clone(), config.mail_api_key.clone())),
            None => Arc::new(LogMailer),
        };

        // 3. Serviços
        let notifier = NotificationDispatcher::new(
            Arc::new(PgNotificationStore::new(notification_repo.clone(), assignment_repo.clone())),
            push,
        );
        let access = AccessService::new(assignment_repo.clone());
        let setup_tokens = SetupTokenStore::new();

        let auth_service = AuthService::new(
            user_repo.clone(),
            setup_tokens.clone(),
            config.jwt_secret.clone(),
            TokenTtl {
                access: chrono::Duration::minutes(config.access_token_minutes),
                refresh: chrono::Duration::days(config.refresh_token_days),
            },
        );
        let user_service = UserService::new(
            user_repo,
            setup_tokens,
            mailer,
            notifier.clone(),
            config.frontend_url.clone(),
        );
        let resource_service = ResourceService::new(
            db_pool.clone(),
            resource_repo.clone(),
            access.clone(),
            notifier,
            config.workflow,
        );
        let member_service = MemberService::new(resource_service.clone(), assignment_repo);
        let dashboard_service = DashboardService::new(resource_repo, access);
        let document_service = DocumentService::new(
            db_pool.clone(),
            resource_service.clone(),
            DocumentRepository::new(),
            MediaStorage::new(config.media_root.clone()),
        );

        Self {
            db_pool,
            config: Arc::new(config),
            auth_service,
            user_service,
            resource_service,
            member_service,
            dashboard_service,
            document_service,
            notifications: NotificationInbox::new(notification_repo),
        }
    }
}
