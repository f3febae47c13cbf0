//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use crate::config::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logger: RUST_LOG manda; sem ele, "info".
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // 1. Configuração (.env + variáveis de ambiente)
    let config = Config::from_env().context("Falha ao carregar a configuração")?;
    let bind_addr = config.bind_addr.clone();

    // 2. Estado da aplicação
    let app_state = AppState::new(config)
        .await
        .context("Falha ao inicializar o estado da aplicação")?;

    // 3. Migrações
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // 4. Administrador inicial
    if let Some(admin) = &app_state.config.admin {
        let created = app_state
            .user_service
            .ensure_admin(&admin.name, &admin.email, &admin.password)
            .await
            .context("Falha ao criar o administrador inicial")?;
        if created {
            tracing::info!("✅ Administrador inicial criado: {}", admin.email);
        }
    }

    // 5. Servidor
    let app = routes::app(app_state);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    tracing::info!("📖 Documentação em http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
