// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

// Papéis do sistema. Conjunto fechado: qualquer outro valor é negado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[serde(alias = "chef de projet", alias = "chef_de_projet")]
    ProjectLead,
    #[serde(alias = "employe")]
    Employee,
    Financier,
    #[serde(alias = "directeur")]
    Director,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::ProjectLead,
        Role::Employee,
        Role::Financier,
        Role::Director,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ProjectLead => "project_lead",
            Role::Employee => "employee",
            Role::Financier => "financier",
            Role::Director => "director",
        }
    }

    /// Lê o papel gravado no token. Desconhecido => None (e a requisição é negada).
    pub fn from_claim(value: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,

    #[serde(rename = "nom")]
    #[schema(example = "Amina Belkacem")]
    pub full_name: String,

    #[schema(example = "amina@exemple.dz")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: Option<String>,

    pub role: Role,

    #[serde(rename = "telephone")]
    pub phone: Option<String>,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub device_token: Option<String>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Preenchido pela exclusão; conta pendente continua com NULL
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Pode autenticar: ativo e não excluído.
    pub fn can_sign_in(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }
}

/// Quem está chamando: usuário do token, com o papel lido do banco.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // Subject (ID do usuário)
    pub role: String,    // Papel no momento da emissão
    pub kind: TokenKind, // access ou refresh
    pub exp: usize,      // Expiration time (quando o token expira)
    pub iat: usize,      // Issued At (quando o token foi criado)
}

// --- Payloads de autenticação ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "amina@exemple.dz")]
    pub email: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshPayload {
    pub refresh: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetPasswordPayload {
    #[validate(length(min = 1, message = "O token é obrigatório."))]
    pub token: String,
    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com os tokens
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

// --- Payloads de usuários ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserPayload {
    #[validate(length(min = 2, max = 100, message = "O nome deve ter entre 2 e 100 caracteres."))]
    pub nom: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,

    pub role: Role,

    #[validate(length(min = 8, max = 15, message = "Telefone inválido."))]
    pub telephone: Option<String>,
}

// Atualização parcial: só o que vier preenchido é alterado.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserPayload {
    #[validate(length(min = 2, max = 100, message = "O nome deve ter entre 2 e 100 caracteres."))]
    pub nom: Option<String>,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    pub role: Option<Role>,

    #[validate(length(min = 8, max = 15, message = "Telefone inválido."))]
    pub telephone: Option<String>,

    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    pub password: Option<String>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeviceTokenPayload {
    #[validate(length(min = 1, max = 4096, message = "Token de dispositivo inválido."))]
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_aliases_are_accepted_on_input() {
        let role: Role = serde_json::from_str("\"chef de projet\"").unwrap();
        assert_eq!(role, Role::ProjectLead);
        let role: Role = serde_json::from_str("\"directeur\"").unwrap();
        assert_eq!(role, Role::Director);
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
    }

    #[test]
    fn unknown_claim_role_is_rejected() {
        assert_eq!(Role::from_claim("financier"), Some(Role::Financier));
        assert_eq!(Role::from_claim("root"), None);
        assert_eq!(Role::from_claim("Admin"), None);
    }

    #[test]
    fn user_serialization_hides_secrets() {
        let user = User {
            id: Uuid::new_v4(),
            full_name: "Amina".into(),
            email: "amina@exemple.dz".into(),
            password_hash: Some("$2b$12$hash".into()),
            role: Role::Employee,
            phone: None,
            device_token: Some("fcm-token".into()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("device_token").is_none());
        assert_eq!(json["nom"], "Amina");
        assert_eq!(json["role"], "employee");
        assert!(json.get("deleted_at").is_none());
    }

    #[test]
    fn deleted_or_pending_users_cannot_sign_in() {
        let mut user = User {
            id: Uuid::new_v4(),
            full_name: "Karim".into(),
            email: "karim@exemple.dz".into(),
            password_hash: None,
            role: Role::ProjectLead,
            phone: None,
            device_token: None,
            is_active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        assert!(!user.can_sign_in());

        user.is_active = true;
        assert!(user.can_sign_in());

        user.deleted_at = Some(Utc::now());
        assert!(!user.can_sign_in());
    }
}
