// src/models/member.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::models::auth::Role;

/// Onde o membro é alocado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberTarget {
    Project(Uuid),
    SubProject(Uuid),
}

// Membro de um projeto/sous-projet, já com os dados do usuário
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Member {
    #[serde(rename = "id_utilisateur")]
    pub user_id: Uuid,
    #[serde(rename = "nom")]
    pub full_name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "date_affectation")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberPayload {
    #[serde(rename = "id_utilisateur")]
    pub user_id: Uuid,
}
