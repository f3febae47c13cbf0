// src/models/resource.rs

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, query_builder::Separated, FromRow, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::{auth::Identity, notification::Announcement},
};

// Tudo que passa pela política de acesso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Project,
    SubProject,
    Meeting,
    Incident,
    Document,
    Invoice,
    Budget,
    Market,
    User,
    Notification,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
}

/// Colunas usadas para restringir linhas ao que o usuário enxerga.
#[derive(Debug, Clone, Copy)]
pub struct ScopeColumns {
    pub project: Option<&'static str>,
    pub sub_project: Option<&'static str>,
}

impl ScopeColumns {
    pub const fn project(column: &'static str) -> Self {
        Self { project: Some(column), sub_project: None }
    }

    pub const fn both(project: &'static str, sub_project: &'static str) -> Self {
        Self { project: Some(project), sub_project: Some(sub_project) }
    }

    pub fn is_empty(&self) -> bool {
        self.project.is_none() && self.sub_project.is_none()
    }
}

/// Projeto/sous-projet a que uma linha pertence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeKeys {
    pub project: Option<Uuid>,
    pub sub_project: Option<Uuid>,
}

impl ScopeKeys {
    pub fn is_empty(&self) -> bool {
        self.project.is_none() && self.sub_project.is_none()
    }
}

/// Até onde um usuário enxerga as linhas de um recurso.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Unrestricted,
    Assigned {
        projects: Vec<Uuid>,
        sub_projects: Vec<Uuid>,
    },
}

impl Scope {
    pub fn permits(&self, keys: &ScopeKeys) -> bool {
        match self {
            Scope::Unrestricted => true,
            Scope::Assigned { projects, sub_projects } => {
                keys.project.is_some_and(|id| projects.contains(&id))
                    || keys.sub_project.is_some_and(|id| sub_projects.contains(&id))
            }
        }
    }
}

/// Listagem por relação: GET /api/<base>/<segment>/{id}/ filtra por `column`.
#[derive(Debug, Clone, Copy)]
pub struct Parent {
    pub segment: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct DateWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// De onde vem a janela de datas que limita um registro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSource {
    Project(Uuid),
    SubProject(Uuid),
}

/// Datas extremas do que já depende da janela de um projeto ou sous-projet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct ChildSpan {
    pub first_start: Option<NaiveDate>,
    pub last_end: Option<NaiveDate>,
    pub first_billing: Option<NaiveDate>,
}

impl ChildSpan {
    /// A nova janela precisa continuar contendo os sous-projets e as faturas existentes.
    pub fn ensure_within(&self, window: &DateWindow) -> Result<(), AppError> {
        if self.first_start.is_some_and(|d| d < window.start_date) {
            return Err(AppError::field(
                "date_debut",
                "excludes_sub_projects",
                "Há sous-projets que começam antes da nova data de início.",
            ));
        }
        if self.last_end.is_some_and(|d| d > window.end_date) {
            return Err(AppError::field(
                "date_fin",
                "excludes_sub_projects",
                "Há sous-projets que terminam depois da nova data de fim.",
            ));
        }
        if self.first_billing.is_some_and(|d| d < window.start_date) {
            return Err(AppError::field(
                "date_debut",
                "excludes_invoices",
                "Há faturas emitidas antes da nova data de início.",
            ));
        }
        Ok(())
    }
}

/// Referências a outros registros que precisam apontar para o mesmo projeto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParentLinks {
    pub project: Option<Uuid>,
    pub sub_project: Option<Uuid>,
    pub market: Option<Uuid>,
    pub budget_line: Option<Uuid>,
}

impl ParentLinks {
    // Com uma referência só não há o que conferir
    pub fn needs_check(&self) -> bool {
        let given = [self.project, self.sub_project, self.market, self.budget_line];
        given.iter().filter(|id| id.is_some()).count() > 1
    }
}

// Controle das transições de status (STATUS_WORKFLOW).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowMode {
    #[default]
    Open,
    Strict,
}

impl FromStr for WorkflowMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(WorkflowMode::Open),
            "strict" => Ok(WorkflowMode::Strict),
            other => Err(anyhow::anyhow!("STATUS_WORKFLOW inválido: {}", other)),
        }
    }
}

/// Os campos graváveis de um recurso, na ordem de `COLUMNS`.
pub trait Record: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    const COLUMNS: &'static [&'static str];

    fn push_values<'args>(self, values: &mut Separated<'_, 'args, Postgres, &'static str>);

    fn scope_keys(&self) -> ScopeKeys;

    fn window_source(&self) -> Option<WindowSource> {
        None
    }

    fn links(&self) -> ParentLinks {
        let keys = self.scope_keys();
        ParentLinks { project: keys.project, sub_project: keys.sub_project, ..ParentLinks::default() }
    }

    /// Período próprio do registro, quando outros registros dependem dele.
    fn own_window(&self) -> Option<DateWindow> {
        None
    }

    /// Regras que atravessam campos (datas, valores, pai obrigatório).
    fn check(&self, _window: Option<&DateWindow>) -> Result<(), AppError> {
        Ok(())
    }

    fn check_transition(&self, _before: &Self, _mode: WorkflowMode) -> Result<(), AppError> {
        Ok(())
    }

    /// Preenche defaults que dependem de quem cria (ex.: autor).
    fn stamp(&mut self, _identity: &Identity) {}
}

/// Um recurso servido pelo repositório genérico.
pub trait Resource: for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static {
    type Fields: Record;

    const KIND: ResourceKind;
    const LABEL: &'static str;
    const TABLE: &'static str;
    // Tabela ou view de leitura
    const SOURCE: &'static str = Self::TABLE;
    const SCOPE: ScopeColumns;
    const ORDER_BY: &'static str = "created_at DESC";
    const PARENTS: &'static [Parent] = &[];

    fn id(&self) -> Uuid;

    fn fields(&self) -> &Self::Fields;

    fn scope_keys(&self) -> ScopeKeys {
        self.fields().scope_keys()
    }

    /// Janela que este registro impõe aos dependentes (projeto, sous-projet).
    fn window_key(&self) -> Option<WindowSource> {
        None
    }

    /// Notificação disparada depois da criação, se houver.
    fn announce(&self) -> Option<Announcement> {
        None
    }
}

// --- Regras compartilhadas ---

pub fn ensure_ordered(
    start: NaiveDate,
    end: NaiveDate,
    field: &'static str,
) -> Result<(), AppError> {
    if start > end {
        return Err(AppError::field(
            field,
            "date_order",
            "A data de fim deve ser igual ou posterior à data de início.",
        ));
    }
    Ok(())
}

pub fn require_parent(project: Option<Uuid>, sub_project: Option<Uuid>) -> Result<(), AppError> {
    if project.is_none() && sub_project.is_none() {
        return Err(AppError::field(
            "id_projet",
            "parent_required",
            "Informe um projeto ou um sous-projet.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_mode_parses_known_values() {
        assert_eq!("open".parse::<WorkflowMode>().unwrap(), WorkflowMode::Open);
        assert_eq!(" STRICT ".parse::<WorkflowMode>().unwrap(), WorkflowMode::Strict);
        assert!("lenient".parse::<WorkflowMode>().is_err());
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert!(ensure_ordered(start, end, "date_fin").is_err());
        assert!(ensure_ordered(end, start, "date_fin").is_ok());
        assert!(ensure_ordered(start, start, "date_fin").is_ok());
    }

    #[test]
    fn assigned_scope_matches_project_or_sub_project() {
        let p = Uuid::new_v4();
        let s = Uuid::new_v4();
        let scope = Scope::Assigned { projects: vec![p], sub_projects: vec![s] };

        assert!(scope.permits(&ScopeKeys { project: Some(p), sub_project: None }));
        assert!(scope.permits(&ScopeKeys { project: Some(Uuid::new_v4()), sub_project: Some(s) }));
        assert!(!scope.permits(&ScopeKeys { project: Some(Uuid::new_v4()), sub_project: None }));
        assert!(!scope.permits(&ScopeKeys::default()));
        assert!(Scope::Unrestricted.permits(&ScopeKeys::default()));
    }

    #[test]
    fn shrinking_window_must_still_contain_children() {
        let d = |m: u32, day: u32| NaiveDate::from_ymd_opt(2025, m, day).unwrap();
        let span = ChildSpan {
            first_start: Some(d(6, 1)),
            last_end: Some(d(9, 30)),
            first_billing: Some(d(4, 15)),
        };

        assert!(span.ensure_within(&DateWindow { start_date: d(1, 1), end_date: d(12, 31) }).is_ok());
        assert!(span.ensure_within(&DateWindow { start_date: d(1, 1), end_date: d(3, 1) }).is_err());
        assert!(span.ensure_within(&DateWindow { start_date: d(7, 1), end_date: d(12, 31) }).is_err());
        // Só a fatura fica de fora
        assert!(span.ensure_within(&DateWindow { start_date: d(5, 1), end_date: d(12, 31) }).is_err());
        assert!(ChildSpan::default().ensure_within(&DateWindow { start_date: d(5, 1), end_date: d(5, 2) }).is_ok());
    }

    #[test]
    fn single_reference_needs_no_cross_check() {
        let one = ParentLinks { project: Some(Uuid::new_v4()), ..Default::default() };
        assert!(!one.needs_check());
        let two = ParentLinks { sub_project: Some(Uuid::new_v4()), ..one };
        assert!(two.needs_check());
        assert!(!ParentLinks::default().needs_check());
    }

    #[test]
    fn parent_is_required() {
        assert!(require_parent(None, None).is_err());
        assert!(require_parent(Some(Uuid::new_v4()), None).is_ok());
        assert!(require_parent(None, Some(Uuid::new_v4())).is_ok());
    }
}
