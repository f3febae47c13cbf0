// src/models/project.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{query_builder::Separated, FromRow, Postgres};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::{
        auth::{Identity, Role},
        notification::{Announcement, Audience, NotificationDraft, NotificationKind},
        resource::{
            ensure_ordered, DateWindow, Parent, Record, Resource, ResourceKind, ScopeColumns,
            ScopeKeys, WindowSource, WorkflowMode,
        },
    },
};

// =============================================================================
//  STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "project_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    #[serde(alias = "planifie")]
    Planned,
    #[serde(alias = "en_cours", alias = "en cours")]
    InProgress,
    #[serde(alias = "suspendu")]
    Suspended,
    #[serde(alias = "termine")]
    Completed,
    #[serde(alias = "annule")]
    Cancelled,
}

impl ProjectStatus {
    /// Tabela de transições do modo estrito. Manter o mesmo status é sempre aceito.
    pub fn can_become(self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;

        self == next
            || matches!(
                (self, next),
                (Planned, InProgress)
                    | (Planned, Suspended)
                    | (Planned, Cancelled)
                    | (InProgress, Suspended)
                    | (InProgress, Completed)
                    | (InProgress, Cancelled)
                    | (Suspended, InProgress)
                    | (Suspended, Cancelled)
            )
    }
}

fn check_status(
    before: ProjectStatus,
    after: ProjectStatus,
    mode: WorkflowMode,
) -> Result<(), AppError> {
    if mode == WorkflowMode::Strict && !before.can_become(after) {
        return Err(AppError::field(
            "statut",
            "invalid_transition",
            format!("Transição de status não permitida: {:?} -> {:?}.", before, after),
        ));
    }
    Ok(())
}

// =============================================================================
//  PROJETO
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct ProjectFields {
    #[serde(rename = "nom_projet")]
    #[validate(length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres."))]
    #[schema(example = "Réhabilitation du barrage")]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,

    #[serde(rename = "date_debut")]
    pub start_date: NaiveDate,

    #[serde(rename = "date_fin")]
    pub end_date: NaiveDate,

    #[serde(rename = "statut", default)]
    pub status: ProjectStatus,

    #[serde(rename = "id_chef_projet", default)]
    pub lead_id: Option<Uuid>,

    #[serde(default)]
    pub budget: Option<Decimal>,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub region: Option<String>,
}

impl Record for ProjectFields {
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "description",
        "start_date",
        "end_date",
        "status",
        "lead_id",
        "budget",
        "region",
    ];

    fn push_values<'args>(self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.name)
            .push_bind(self.description)
            .push_bind(self.start_date)
            .push_bind(self.end_date)
            .push_bind(self.status)
            .push_bind(self.lead_id)
            .push_bind(self.budget)
            .push_bind(self.region);
    }

    // Um projeto novo ainda não pertence a nada.
    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys::default()
    }

    fn own_window(&self) -> Option<DateWindow> {
        Some(DateWindow { start_date: self.start_date, end_date: self.end_date })
    }

    fn check(&self, _window: Option<&DateWindow>) -> Result<(), AppError> {
        ensure_ordered(self.start_date, self.end_date, "date_fin")?;
        if self.budget.is_some_and(|b| b < Decimal::ZERO) {
            return Err(AppError::field("budget", "negative", "O orçamento não pode ser negativo."));
        }
        Ok(())
    }

    fn check_transition(&self, before: &Self, mode: WorkflowMode) -> Result<(), AppError> {
        check_status(before.status, self.status, mode)
    }

    // Chefe de projeto que cria um projeto sem chefe vira o chefe.
    fn stamp(&mut self, identity: &Identity) {
        if self.lead_id.is_none() && identity.role == Role::ProjectLead {
            self.lead_id = Some(identity.user_id);
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Project {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: ProjectFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Project {
    type Fields = ProjectFields;

    const KIND: ResourceKind = ResourceKind::Project;
    const LABEL: &'static str = "Projeto";
    const TABLE: &'static str = "projects";
    const SCOPE: ScopeColumns = ScopeColumns::project("id");

    fn id(&self) -> Uuid {
        self.id
    }

    fn fields(&self) -> &ProjectFields {
        &self.fields
    }

    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys { project: Some(self.id), sub_project: None }
    }

    fn window_key(&self) -> Option<WindowSource> {
        Some(WindowSource::Project(self.id))
    }

    fn announce(&self) -> Option<Announcement> {
        Some(Announcement {
            draft: NotificationDraft {
                title: "New Project Created".to_string(),
                body: format!("A new project '{}' has been created", self.fields.name),
                kind: NotificationKind::NewProject,
                link: Some(format!("/projects/{}", self.id)),
            },
            audience: vec![Audience::Admins, Audience::ProjectStaff(self.id)],
        })
    }
}

// =============================================================================
//  SOUS-PROJET
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct SubProjectFields {
    #[serde(rename = "id_projet")]
    pub project_id: Uuid,

    #[serde(rename = "nom_sous_projet")]
    #[validate(length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres."))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,

    #[serde(rename = "date_debut")]
    pub start_date: NaiveDate,

    #[serde(rename = "date_fin")]
    pub end_date: NaiveDate,

    #[serde(rename = "statut", default)]
    pub status: ProjectStatus,

    #[serde(rename = "id_chef_projet", default)]
    pub lead_id: Option<Uuid>,
}

impl Record for SubProjectFields {
    const COLUMNS: &'static [&'static str] = &[
        "project_id",
        "name",
        "description",
        "start_date",
        "end_date",
        "status",
        "lead_id",
    ];

    fn push_values<'args>(self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.project_id)
            .push_bind(self.name)
            .push_bind(self.description)
            .push_bind(self.start_date)
            .push_bind(self.end_date)
            .push_bind(self.status)
            .push_bind(self.lead_id);
    }

    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys { project: Some(self.project_id), sub_project: None }
    }

    fn window_source(&self) -> Option<WindowSource> {
        Some(WindowSource::Project(self.project_id))
    }

    fn own_window(&self) -> Option<DateWindow> {
        Some(DateWindow { start_date: self.start_date, end_date: self.end_date })
    }

    fn check(&self, window: Option<&DateWindow>) -> Result<(), AppError> {
        ensure_ordered(self.start_date, self.end_date, "date_fin")?;

        // O sous-projet tem de caber dentro do projeto
        if let Some(window) = window {
            if self.start_date < window.start_date {
                return Err(AppError::field(
                    "date_debut",
                    "outside_project",
                    "O sous-projet não pode começar antes do projeto.",
                ));
            }
            if self.end_date > window.end_date {
                return Err(AppError::field(
                    "date_fin",
                    "outside_project",
                    "O sous-projet não pode terminar depois do projeto.",
                ));
            }
        }
        Ok(())
    }

    fn check_transition(&self, before: &Self, mode: WorkflowMode) -> Result<(), AppError> {
        check_status(before.status, self.status, mode)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SubProject {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: SubProjectFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for SubProject {
    type Fields = SubProjectFields;

    const KIND: ResourceKind = ResourceKind::SubProject;
    const LABEL: &'static str = "Sous-projet";
    const TABLE: &'static str = "sub_projects";
    const SCOPE: ScopeColumns = ScopeColumns::both("project_id", "id");
    const PARENTS: &'static [Parent] = &[Parent { segment: "projet", column: "project_id" }];

    fn id(&self) -> Uuid {
        self.id
    }

    fn fields(&self) -> &SubProjectFields {
        &self.fields
    }

    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys { project: Some(self.fields.project_id), sub_project: Some(self.id) }
    }

    fn window_key(&self) -> Option<WindowSource> {
        Some(WindowSource::SubProject(self.id))
    }

    fn announce(&self) -> Option<Announcement> {
        let mut audience = vec![Audience::ProjectStaff(self.fields.project_id)];
        if let Some(lead) = self.fields.lead_id {
            audience.push(Audience::User(lead));
        }

        Some(Announcement {
            draft: NotificationDraft {
                title: "New Subproject Created".to_string(),
                body: format!("A new subproject '{}' has been created", self.fields.name),
                kind: NotificationKind::NewSubProject,
                link: Some(format!("/subprojects/{}", self.id)),
            },
            audience,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project_fields(start: NaiveDate, end: NaiveDate) -> ProjectFields {
        ProjectFields {
            name: "Barrage".into(),
            description: String::new(),
            start_date: start,
            end_date: end,
            status: ProjectStatus::Planned,
            lead_id: None,
            budget: None,
            region: None,
        }
    }

    fn sub_project_fields(start: NaiveDate, end: NaiveDate) -> SubProjectFields {
        SubProjectFields {
            project_id: Uuid::new_v4(),
            name: "Lot 1".into(),
            description: String::new(),
            start_date: start,
            end_date: end,
            status: ProjectStatus::Planned,
            lead_id: None,
        }
    }

    #[test]
    fn project_dates_must_be_ordered() {
        assert!(project_fields(date(2025, 1, 1), date(2025, 12, 31)).check(None).is_ok());
        assert!(project_fields(date(2025, 12, 31), date(2025, 1, 1)).check(None).is_err());
    }

    #[test]
    fn sub_project_must_fit_inside_project() {
        let window = DateWindow { start_date: date(2025, 1, 1), end_date: date(2025, 6, 30) };

        assert!(sub_project_fields(date(2025, 2, 1), date(2025, 3, 1)).check(Some(&window)).is_ok());
        assert!(sub_project_fields(date(2024, 12, 1), date(2025, 3, 1)).check(Some(&window)).is_err());
        assert!(sub_project_fields(date(2025, 2, 1), date(2025, 7, 1)).check(Some(&window)).is_err());
        assert!(sub_project_fields(date(2025, 3, 1), date(2025, 2, 1)).check(Some(&window)).is_err());
    }

    #[test]
    fn lead_becomes_owner_of_new_project() {
        let lead = Identity { user_id: Uuid::new_v4(), role: Role::ProjectLead };
        let mut fields = project_fields(date(2025, 1, 1), date(2025, 2, 1));
        fields.stamp(&lead);
        assert_eq!(fields.lead_id, Some(lead.user_id));

        let admin = Identity { user_id: Uuid::new_v4(), role: Role::Admin };
        let mut fields = project_fields(date(2025, 1, 1), date(2025, 2, 1));
        fields.stamp(&admin);
        assert_eq!(fields.lead_id, None);
    }

    #[test]
    fn strict_workflow_blocks_reopening_completed_projects() {
        let mut before = project_fields(date(2025, 1, 1), date(2025, 2, 1));
        before.status = ProjectStatus::Completed;
        let mut after = before.clone();
        after.status = ProjectStatus::InProgress;

        assert!(after.check_transition(&before, WorkflowMode::Open).is_ok());
        assert!(after.check_transition(&before, WorkflowMode::Strict).is_err());
        assert!(ProjectStatus::Planned.can_become(ProjectStatus::InProgress));
        assert!(ProjectStatus::Cancelled.can_become(ProjectStatus::Cancelled));
    }

    #[test]
    fn wire_names_use_domain_vocabulary() {
        let payload = serde_json::json!({
            "nom_projet": "Barrage",
            "date_debut": "2025-01-01",
            "date_fin": "2025-06-30",
            "statut": "en_cours"
        });
        let fields: ProjectFields = serde_json::from_value(payload).unwrap();
        assert_eq!(fields.status, ProjectStatus::InProgress);
        assert_eq!(fields.description, "");
    }

    #[test]
    fn new_project_announces_to_admins_and_staff() {
        let project = Project {
            id: Uuid::new_v4(),
            fields: project_fields(date(2025, 1, 1), date(2025, 2, 1)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let announcement = project.announce().unwrap();
        assert_eq!(announcement.draft.kind, NotificationKind::NewProject);
        assert_eq!(
            announcement.audience,
            vec![Audience::Admins, Audience::ProjectStaff(project.id)]
        );
    }
}
