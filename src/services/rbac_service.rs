// src/services/rbac_service.rs

use crate::{
    common::error::AppError,
    db::AssignmentRepository,
    models::{
        auth::{Identity, Role},
        resource::{Action, ResourceKind, Scope, ScopeColumns},
    },
};

use Action::*;

const CRUD: &[Action] = &[List, Read, Create, Update, Delete];
const CONTRIBUTE: &[Action] = &[List, Read, Create, Update];
const READ: &[Action] = &[List, Read];
// Notificações: cada um só mexe nas próprias
const OWN: &[Action] = &[List, Read, Update];
const VIEW: &[Action] = &[Read];
const NONE: &[Action] = &[];

/// Como as linhas de um recurso são filtradas para um papel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    Unrestricted,
    Assigned,
}

// A tabela (papel, recurso) -> ações. Qualquer par fora dela é negado.
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn grants(role: Role, kind: ResourceKind) -> &'static [Action] {
        use ResourceKind as K;

        match (role, kind) {
            // 1. Comuns a todos
            (_, K::Notification) => OWN,
            (_, K::Dashboard) => VIEW,

            // 2. Admin faz tudo
            (Role::Admin, _) => CRUD,

            // 3. Diretor só consulta
            (Role::Director, _) => READ,

            // 4. Chefe de projeto
            (Role::ProjectLead, K::Project | K::SubProject | K::Meeting) => CRUD,
            (Role::ProjectLead, K::Incident | K::Document) => CRUD,
            (Role::ProjectLead, K::Invoice | K::Budget | K::Market) => READ,
            (Role::ProjectLead, K::User) => READ,

            // 5. Funcionário
            (Role::Employee, K::Project | K::SubProject | K::Meeting) => READ,
            (Role::Employee, K::Incident | K::Document) => CONTRIBUTE,
            (Role::Employee, K::Invoice | K::Budget | K::Market) => NONE,
            (Role::Employee, K::User) => READ,

            // 6. Financeiro
            (Role::Financier, K::Project | K::SubProject | K::Meeting) => READ,
            (Role::Financier, K::Incident) => NONE,
            (Role::Financier, K::Document) => CONTRIBUTE,
            (Role::Financier, K::Invoice | K::Budget | K::Market) => CRUD,
            (Role::Financier, K::User) => READ,
        }
    }

    pub fn allows(role: Role, kind: ResourceKind, action: Action) -> bool {
        Self::grants(role, kind).contains(&action)
    }

    pub fn scope_mode(role: Role) -> ScopeMode {
        match role {
            Role::Admin | Role::Director | Role::Financier => ScopeMode::Unrestricted,
            Role::ProjectLead | Role::Employee => ScopeMode::Assigned,
        }
    }
}

/// Checagem de papel: roda antes de qualquer acesso a dados.
pub fn authorize(identity: &Identity, kind: ResourceKind, action: Action) -> Result<(), AppError> {
    if AccessPolicy::allows(identity.role, kind, action) {
        Ok(())
    } else {
        tracing::debug!(
            user = %identity.user_id,
            role = identity.role.as_str(),
            ?kind,
            ?action,
            "acesso negado"
        );
        Err(AppError::Forbidden)
    }
}

#[derive(Clone)]
pub struct AccessService {
    assignments: AssignmentRepository,
}

impl AccessService {
    pub fn new(assignments: AssignmentRepository) -> Self {
        Self { assignments }
    }

    /// Filtro de linhas do usuário para um recurso com as colunas dadas.
    pub async fn scope(&self, identity: &Identity, columns: &ScopeColumns) -> Result<Scope, AppError> {
        if columns.is_empty() || AccessPolicy::scope_mode(identity.role) == ScopeMode::Unrestricted {
            return Ok(Scope::Unrestricted);
        }

        let projects = self.assignments.visible_projects(identity.user_id).await?;
        let sub_projects = self.assignments.visible_sub_projects(identity.user_id).await?;

        Ok(Scope::Assigned { projects, sub_projects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn admin_can_do_everything_on_resources() {
        for kind in [ResourceKind::Project, ResourceKind::Invoice, ResourceKind::User] {
            assert_eq!(AccessPolicy::grants(Role::Admin, kind), CRUD);
        }
    }

    #[test]
    fn director_is_read_only() {
        assert!(AccessPolicy::allows(Role::Director, ResourceKind::Invoice, Action::List));
        assert!(!AccessPolicy::allows(Role::Director, ResourceKind::Project, Action::Create));
        assert!(!AccessPolicy::allows(Role::Director, ResourceKind::User, Action::Delete));
    }

    #[test]
    fn employee_contributes_incidents_but_never_deletes() {
        assert!(AccessPolicy::allows(Role::Employee, ResourceKind::Incident, Action::Create));
        assert!(AccessPolicy::allows(Role::Employee, ResourceKind::Document, Action::Update));
        assert!(!AccessPolicy::allows(Role::Employee, ResourceKind::Incident, Action::Delete));
        assert!(!AccessPolicy::allows(Role::Employee, ResourceKind::Invoice, Action::Read));
        assert!(!AccessPolicy::allows(Role::Employee, ResourceKind::Project, Action::Create));
    }

    #[test]
    fn financier_owns_finance_but_not_incidents() {
        assert_eq!(AccessPolicy::grants(Role::Financier, ResourceKind::Budget), CRUD);
        assert!(AccessPolicy::grants(Role::Financier, ResourceKind::Incident).is_empty());
        assert!(AccessPolicy::allows(Role::Financier, ResourceKind::Document, Action::Create));
    }

    #[test]
    fn lead_reads_finance_and_manages_projects() {
        assert!(AccessPolicy::allows(Role::ProjectLead, ResourceKind::Project, Action::Create));
        assert!(AccessPolicy::allows(Role::ProjectLead, ResourceKind::Market, Action::Read));
        assert!(!AccessPolicy::allows(Role::ProjectLead, ResourceKind::Invoice, Action::Create));
    }

    #[test]
    fn every_role_reads_dashboard_and_own_notifications() {
        for role in Role::ALL {
            assert!(AccessPolicy::allows(role, ResourceKind::Dashboard, Action::Read));
            assert!(AccessPolicy::allows(role, ResourceKind::Notification, Action::Update));
            assert!(!AccessPolicy::allows(role, ResourceKind::Notification, Action::Create));
        }
    }

    #[test]
    fn authorize_maps_denial_to_forbidden() {
        let employee = Identity { user_id: Uuid::new_v4(), role: Role::Employee };
        let err = authorize(&employee, ResourceKind::Budget, Action::List).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn only_leads_and_employees_are_scoped() {
        assert_eq!(AccessPolicy::scope_mode(Role::Financier), ScopeMode::Unrestricted);
        assert_eq!(AccessPolicy::scope_mode(Role::Director), ScopeMode::Unrestricted);
        assert_eq!(AccessPolicy::scope_mode(Role::ProjectLead), ScopeMode::Assigned);
        assert_eq!(AccessPolicy::scope_mode(Role::Employee), ScopeMode::Assigned);
    }
}
