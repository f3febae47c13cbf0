// src/models/meeting.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{query_builder::Separated, FromRow, Postgres};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::{
        auth::Identity,
        notification::{Announcement, Audience, NotificationDraft, NotificationKind},
        resource::{DateWindow, Parent, Record, Resource, ResourceKind, ScopeColumns, ScopeKeys},
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct MeetingFields {
    #[serde(rename = "id_projet")]
    pub project_id: Uuid,

    #[serde(rename = "id_organisateur", default)]
    pub organizer_id: Option<Uuid>,

    #[serde(rename = "date_reunion")]
    pub meeting_date: NaiveDate,

    #[serde(rename = "heure_reunion", default)]
    #[schema(value_type = Option<String>, example = "09:30:00")]
    pub meeting_time: Option<NaiveTime>,

    #[serde(rename = "ordre_du_jour")]
    #[validate(length(min = 1, max = 2000, message = "A ordem do dia é obrigatória."))]
    pub agenda: String,

    #[serde(rename = "lieu_reunion", default)]
    #[validate(length(max = 100))]
    pub location: Option<String>,

    #[serde(rename = "numero_pv", default)]
    pub minutes_number: Option<i32>,
}

impl Record for MeetingFields {
    const COLUMNS: &'static [&'static str] = &[
        "project_id",
        "organizer_id",
        "meeting_date",
        "meeting_time",
        "agenda",
        "location",
        "minutes_number",
    ];

    fn push_values<'args>(self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.project_id)
            .push_bind(self.organizer_id)
            .push_bind(self.meeting_date)
            .push_bind(self.meeting_time)
            .push_bind(self.agenda)
            .push_bind(self.location)
            .push_bind(self.minutes_number);
    }

    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys { project: Some(self.project_id), sub_project: None }
    }

    fn check(&self, _window: Option<&DateWindow>) -> Result<(), AppError> {
        if self.minutes_number.is_some_and(|n| n <= 0) {
            return Err(AppError::field("numero_pv", "range", "O número do PV deve ser positivo."));
        }
        Ok(())
    }

    fn stamp(&mut self, identity: &Identity) {
        self.organizer_id.get_or_insert(identity.user_id);
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Meeting {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: MeetingFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Meeting {
    type Fields = MeetingFields;

    const KIND: ResourceKind = ResourceKind::Meeting;
    const LABEL: &'static str = "Reunião";
    const TABLE: &'static str = "meetings";
    const SCOPE: ScopeColumns = ScopeColumns::project("project_id");
    const ORDER_BY: &'static str = "meeting_date DESC, created_at DESC";
    const PARENTS: &'static [Parent] = &[Parent { segment: "projet", column: "project_id" }];

    fn id(&self) -> Uuid {
        self.id
    }

    fn fields(&self) -> &MeetingFields {
        &self.fields
    }

    fn announce(&self) -> Option<Announcement> {
        Some(Announcement {
            draft: NotificationDraft {
                title: "New Reunion Scheduled".to_string(),
                body: format!("A new reunion '{}' has been scheduled", self.fields.agenda),
                kind: NotificationKind::NewMeeting,
                link: Some(format!("/reunions/{}", self.id)),
            },
            audience: vec![Audience::ProjectStaff(self.fields.project_id)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;

    #[test]
    fn organizer_defaults_to_creator() {
        let mut fields: MeetingFields = serde_json::from_value(serde_json::json!({
            "id_projet": Uuid::new_v4(),
            "date_reunion": "2025-04-10",
            "heure_reunion": "09:30:00",
            "ordre_du_jour": "Avancement du lot 2"
        }))
        .unwrap();

        let me = Identity { user_id: Uuid::new_v4(), role: Role::ProjectLead };
        fields.stamp(&me);

        assert_eq!(fields.organizer_id, Some(me.user_id));
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn empty_agenda_is_invalid() {
        let fields: MeetingFields = serde_json::from_value(serde_json::json!({
            "id_projet": Uuid::new_v4(),
            "date_reunion": "2025-04-10",
            "ordre_du_jour": ""
        }))
        .unwrap();

        assert!(fields.validate().is_err());
    }
}
