// src/services/user_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    db::{user_repo::UserChanges, UserRepository},
    models::{
        auth::{CreateUserPayload, Identity, UpdateUserPayload, User},
        notification::{Announcement, Audience, NotificationDraft, NotificationKind},
        resource::{Action, ResourceKind},
    },
    services::{
        auth::hash_password,
        mailer::Mailer,
        notification_service::NotificationDispatcher,
        rbac_service::authorize,
        setup_token::SetupTokenStore,
    },
};

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    setup_tokens: SetupTokenStore,
    mailer: Arc<dyn Mailer>,
    notifier: NotificationDispatcher,
    frontend_url: String,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        setup_tokens: SetupTokenStore,
        mailer: Arc<dyn Mailer>,
        notifier: NotificationDispatcher,
        frontend_url: String,
    ) -> Self {
        Self { user_repo, setup_tokens, mailer, notifier, frontend_url }
    }

    pub async fn list(
        &self,
        identity: &Identity,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), AppError> {
        authorize(identity, ResourceKind::User, Action::List)?;

        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let users = self.user_repo.list(search, page).await?;
        let count = self.user_repo.count(search).await?;
        Ok((users, count))
    }

    pub async fn get(&self, identity: &Identity, id: Uuid) -> Result<User, AppError> {
        authorize(identity, ResourceKind::User, Action::Read)?;
        self.user_repo
            .find_by_id(id)
            .await?
            .filter(|user| user.deleted_at.is_none())
            .ok_or(AppError::NotFound("Usuário"))
    }

    // Sempre permitido: é o próprio usuário
    pub async fn me(&self, identity: &Identity) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(identity.user_id)
            .await?
            .ok_or(AppError::NotFound("Usuário"))
    }

    /// Cria a conta sem senha e envia o link de definição.
    pub async fn create(&self, identity: &Identity, payload: CreateUserPayload) -> Result<User, AppError> {
        authorize(identity, ResourceKind::User, Action::Create)?;
        payload.validate()?;

        // 1. Usuário inativo, sem senha
        let email = payload.email.trim().to_lowercase();
        let user = self
            .user_repo
            .create_user(
                self.user_repo.pool(),
                payload.nom.trim(),
                &email,
                payload.role,
                payload.telephone.as_deref(),
            )
            .await?;

        // 2. Token + e-mail, fora da requisição
        let token = self.setup_tokens.issue(user.id)?;
        let link = setup_link(&self.frontend_url, &token);
        let mailer = self.mailer.clone();
        let (to, name) = (user.email.clone(), user.full_name.clone());
        tokio::spawn(async move {
            if let Err(e) = mailer.send_password_setup(&to, &name, &link).await {
                tracing::warn!(%to, "Falha ao enviar e-mail de definição de senha: {:#}", e);
            }
        });

        // 3. Avisa os administradores
        self.notifier.announce_detached(Announcement {
            draft: NotificationDraft {
                title: "New user".into(),
                body: format!("User '{}' ({}) has been created", user.full_name, user.role.as_str()),
                kind: NotificationKind::Info,
                link: Some(format!("/users/{}", user.id)),
            },
            audience: vec![Audience::Admins],
        });

        tracing::info!(user = %user.id, by = %identity.user_id, "✅ Usuário criado");
        Ok(user)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        payload: UpdateUserPayload,
    ) -> Result<User, AppError> {
        authorize(identity, ResourceKind::User, Action::Update)?;
        payload.validate()?;

        let password_hash = match payload.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let changes = UserChanges {
            full_name: payload.nom.map(|n| n.trim().to_string()),
            email: payload.email.map(|e| e.trim().to_lowercase()),
            role: payload.role,
            phone: payload.telephone,
            password_hash,
            is_active: payload.is_active,
        };

        let user = self
            .user_repo
            .update_user(id, changes)
            .await?
            .ok_or(AppError::NotFound("Usuário"))?;

        self.notifier.announce_detached(Announcement {
            draft: NotificationDraft {
                title: "Profile Updated".into(),
                body: "Your profile has been updated by an administrator".into(),
                kind: NotificationKind::Info,
                link: Some("/profile".into()),
            },
            audience: vec![Audience::User(user.id)],
        });

        Ok(user)
    }

    // Exclusão lógica, inclusive de contas que ainda não definiram a senha
    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<(), AppError> {
        authorize(identity, ResourceKind::User, Action::Delete)?;

        if id == identity.user_id {
            return Err(AppError::InvalidInput("Você não pode remover a própria conta.".to_string()));
        }

        let user = self.user_repo.find_by_id(id).await?.ok_or(AppError::NotFound("Usuário"))?;
        if !self.user_repo.deactivate(id).await? {
            return Err(AppError::NotFound("Usuário"));
        }

        // O link de definição de senha não pode reativar a conta
        let revoked = self.setup_tokens.revoke_user(id)?;
        if revoked > 0 {
            tracing::debug!(user = %id, revoked, "Tokens de definição de senha revogados");
        }

        self.notifier.announce_detached(Announcement {
            draft: NotificationDraft {
                title: "User Deleted".into(),
                body: format!("User '{}' has been deleted", user.full_name),
                kind: NotificationKind::Warning,
                link: None,
            },
            audience: vec![Audience::Admins],
        });

        tracing::info!(user = %id, by = %identity.user_id, "Usuário desativado");
        Ok(())
    }

    /// Primeiro acesso ao sistema: só cria se ainda não existe nenhum admin.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<bool, AppError> {
        let password_hash = hash_password(password.to_string()).await?;
        self.user_repo
            .ensure_admin(name.trim(), &email.trim().to_lowercase(), &password_hash)
            .await
    }

    pub async fn set_device_token(&self, identity: &Identity, token: &str) -> Result<(), AppError> {
        self.user_repo.set_device_token(identity.user_id, Some(token)).await
    }
}

fn setup_link(frontend_url: &str, token: &str) -> String {
    format!("{}/set-password/{}", frontend_url.trim_end_matches('/'), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_link_has_no_double_slash() {
        assert_eq!(
            setup_link("http://localhost:5173/", "abc"),
            "http://localhost:5173/set-password/abc"
        );
        assert_eq!(
            setup_link("https://app.exemple.dz", "abc"),
            "https://app.exemple.dz/set-password/abc"
        );
    }
}
