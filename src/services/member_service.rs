// src/services/member_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AssignmentRepository,
    models::{
        auth::Identity,
        member::{Member, MemberTarget},
        project::{Project, SubProject},
        resource::{Action, ResourceKind},
    },
    services::{rbac_service::authorize, resource_service::ResourceService},
};

// Alocação de usuários em projetos e sous-projets.
// Quem pode editar o alvo (e o enxerga) pode gerenciar os membros.
#[derive(Clone)]
pub struct MemberService {
    resources: ResourceService,
    assignments: AssignmentRepository,
}

impl MemberService {
    pub fn new(resources: ResourceService, assignments: AssignmentRepository) -> Self {
        Self { resources, assignments }
    }

    pub async fn list(&self, identity: &Identity, target: MemberTarget) -> Result<Vec<Member>, AppError> {
        self.ensure_manageable(identity, target).await?;
        self.assignments.list_members(target).await
    }

    pub async fn add(&self, identity: &Identity, target: MemberTarget, user_id: Uuid) -> Result<Vec<Member>, AppError> {
        self.ensure_manageable(identity, target).await?;
        self.assignments.add_member(target, user_id).await?;

        tracing::info!(?target, user = %user_id, by = %identity.user_id, "Membro alocado");
        self.assignments.list_members(target).await
    }

    pub async fn remove(&self, identity: &Identity, target: MemberTarget, user_id: Uuid) -> Result<(), AppError> {
        self.ensure_manageable(identity, target).await?;

        if !self.assignments.remove_member(target, user_id).await? {
            return Err(AppError::NotFound("Membro"));
        }
        tracing::info!(?target, user = %user_id, by = %identity.user_id, "Membro removido");
        Ok(())
    }

    async fn ensure_manageable(&self, identity: &Identity, target: MemberTarget) -> Result<(), AppError> {
        // 1. Papel: precisa poder editar o alvo
        let kind = match target {
            MemberTarget::Project(_) => ResourceKind::Project,
            MemberTarget::SubProject(_) => ResourceKind::SubProject,
        };
        authorize(identity, kind, Action::Update)?;

        // 2. Existe e está no escopo
        match target {
            MemberTarget::Project(id) => self.resources.get::<Project>(identity, id).await.map(|_| ()),
            MemberTarget::SubProject(id) => self.resources.get::<SubProject>(identity, id).await.map(|_| ()),
        }
    }
}
