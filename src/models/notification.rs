// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "notification_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Warning,
    NewProject,
    NewSubProject,
    #[serde(alias = "new_reunion")]
    NewMeeting,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::NewProject => "new_project",
            NotificationKind::NewSubProject => "new_sub_project",
            NotificationKind::NewMeeting => "new_meeting",
        }
    }
}

// Uma linha da caixa de entrada de um usuário
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: Uuid,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub user_id: Uuid,

    #[serde(rename = "titre")]
    pub title: String,

    #[serde(rename = "contenu")]
    pub body: String,

    #[serde(rename = "type")]
    pub kind: NotificationKind,

    #[serde(rename = "lien")]
    pub link: Option<String>,

    #[serde(rename = "lu")]
    pub is_read: bool,

    pub created_at: DateTime<Utc>,
}

/// O conteúdo de uma notificação antes de ter destinatário.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
}

/// Quem deve receber um aviso, resolvido no momento do envio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Admins,
    // Chefe do projeto + membros
    ProjectStaff(Uuid),
    User(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub draft: NotificationDraft,
    pub audience: Vec<Audience>,
}

/// Resultado de um envio, para log e testes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub persisted: usize,
    pub pushed: usize,
    pub push_failures: usize,
}
