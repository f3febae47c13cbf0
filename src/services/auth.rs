// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use validator::Validate;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, Identity, Role, SetPasswordPayload, TokenKind, TokenPair, User},
    services::setup_token::SetupTokenStore,
};

/// Tempo de vida dos tokens (ACCESS_TOKEN_MINUTES / REFRESH_TOKEN_DAYS).
#[derive(Debug, Clone, Copy)]
pub struct TokenTtl {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access: Duration::minutes(60),
            refresh: Duration::days(7),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    setup_tokens: SetupTokenStore,
    jwt_secret: String,
    ttl: TokenTtl,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        setup_tokens: SetupTokenStore,
        jwt_secret: String,
        ttl: TokenTtl,
    ) -> Self {
        Self { user_repo, setup_tokens, jwt_secret, ttl }
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .filter(User::can_sign_in)
            .ok_or(AppError::InvalidCredentials)?;

        // Conta criada mas sem senha definida ainda
        let Some(password_hash) = user.password_hash.clone() else {
            return Err(AppError::InvalidCredentials);
        };

        let password_clone = password.to_owned();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user = %user.id, "Login efetuado");
        self.issue_pair(&user)
    }

    /// Troca um refresh válido por um novo par. O usuário é recarregado:
    /// contas desativadas (ou com papel alterado) não herdam o token antigo.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.decode_claims(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AppError::InvalidToken);
        }

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .filter(User::can_sign_in)
            .ok_or(AppError::InvalidToken)?;

        self.issue_pair(&user)
    }

    /// Valida o access token e recarrega o usuário a cada requisição.
    /// Exclusão, desativação e troca de papel valem imediatamente; o papel vem do banco.
    pub async fn validate_access(&self, token: &str) -> Result<Identity, AppError> {
        let claims = self.decode_claims(token)?;
        if claims.kind != TokenKind::Access {
            return Err(AppError::InvalidToken);
        }
        Role::from_claim(&claims.role).ok_or(AppError::InvalidToken)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .filter(User::can_sign_in)
            .ok_or(AppError::InvalidToken)?;

        Ok(Identity { user_id: user.id, role: user.role })
    }

    pub async fn set_password(&self, payload: SetPasswordPayload) -> Result<(), AppError> {
        payload.validate()?;

        // 1. Consome o token (uma única vez)
        let user_id = self.setup_tokens.consume(&payload.token)?;

        // 2. Hash
        let password_hash = hash_password(payload.password).await?;

        // 3. Grava e ativa
        if !self.user_repo.set_password(user_id, &password_hash).await? {
            return Err(AppError::NotFound("Usuário"));
        }

        tracing::info!(user = %user_id, "Senha definida");
        Ok(())
    }

    pub fn create_token(&self, user_id: uuid::Uuid, role: Role, kind: TokenKind) -> Result<String, AppError> {
        let now = Utc::now();
        let lifetime = match kind {
            TokenKind::Access => self.ttl.access,
            TokenKind::Refresh => self.ttl.refresh,
        };

        let claims = Claims {
            sub: user_id,
            role: role.as_str().to_string(),
            kind,
            exp: (now + lifetime).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.create_token(user.id, user.role, TokenKind::Access)?,
            refresh: self.create_token(user.id, user.role, TokenKind::Refresh)?,
        })
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }
}

/// bcrypt fora do runtime async.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}
