// src/models/incident.rs

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
        resource::{
            require_parent, DateWindow, Parent, Record, Resource, ResourceKind, ScopeColumns,
            ScopeKeys,
        },
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct IncidentFields {
    #[serde(rename = "id_projet", default)]
    pub project_id: Option<Uuid>,

    #[serde(rename = "id_sous_projet", default)]
    pub sub_project_id: Option<Uuid>,

    #[validate(length(min = 1, max = 2000, message = "A descrição é obrigatória."))]
    pub description: String,

    #[serde(rename = "date_incident")]
    pub incident_date: NaiveDate,

    #[serde(rename = "heure_incident", default)]
    #[schema(value_type = Option<String>, example = "14:05:00")]
    pub incident_time: Option<NaiveTime>,

    #[serde(rename = "lieu_incident", default)]
    #[validate(length(max = 100))]
    pub location: Option<String>,

    #[serde(rename = "type_incident", default)]
    #[validate(length(max = 50))]
    pub kind: Option<String>,

    #[serde(rename = "id_signale_par", default)]
    pub reporter_id: Option<Uuid>,
}

impl Record for IncidentFields {
    const COLUMNS: &'static [&'static str] = &[
        "project_id",
        "sub_project_id",
        "description",
        "incident_date",
        "incident_time",
        "location",
        "kind",
        "reporter_id",
    ];

    fn push_values<'args>(self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.project_id)
            .push_bind(self.sub_project_id)
            .push_bind(self.description)
            .push_bind(self.incident_date)
            .push_bind(self.incident_time)
            .push_bind(self.location)
            .push_bind(self.kind)
            .push_bind(self.reporter_id);
    }

    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys { project: self.project_id, sub_project: self.sub_project_id }
    }

    fn check(&self, _window: Option<&DateWindow>) -> Result<(), AppError> {
        require_parent(self.project_id, self.sub_project_id)
    }

    fn stamp(&mut self, identity: &Identity) {
        self.reporter_id.get_or_insert(identity.user_id);
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Incident {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: IncidentFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Incident {
    type Fields = IncidentFields;

    const KIND: ResourceKind = ResourceKind::Incident;
    const LABEL: &'static str = "Incidente";
    const TABLE: &'static str = "incidents";
    const SCOPE: ScopeColumns = ScopeColumns::both("project_id", "sub_project_id");
    const ORDER_BY: &'static str = "incident_date DESC, created_at DESC";
    const PARENTS: &'static [Parent] = &[
        Parent { segment: "projet", column: "project_id" },
        Parent { segment: "sous-projet", column: "sub_project_id" },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn fields(&self) -> &IncidentFields {
        &self.fields
    }
}
