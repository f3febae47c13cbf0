// src/services/dashboard_service.rs

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::{ListFilter, ResourceRepository},
    models::{
        auth::{Identity, Role},
        dashboard::{Assignments, Dashboard, Overview},
        document::Document,
        finance::{BudgetLine, Invoice, Market},
        incident::Incident,
        meeting::Meeting,
        project::{Project, SubProject},
        resource::{Action, ResourceKind, Resource},
    },
    services::rbac_service::{authorize, AccessPolicy, AccessService},
};

// Recalculado a cada requisição, sem cache.
#[derive(Clone)]
pub struct DashboardService {
    repo: ResourceRepository,
    access: AccessService,
}

impl DashboardService {
    pub fn new(repo: ResourceRepository, access: AccessService) -> Self {
        Self { repo, access }
    }

    pub async fn get(&self, identity: &Identity) -> Result<Dashboard, AppError> {
        authorize(identity, ResourceKind::Dashboard, Action::Read)?;

        match identity.role {
            Role::Employee => Ok(Dashboard::Assignments(self.assignments(identity).await?)),
            _ => Ok(Dashboard::Overview(self.overview(identity).await?)),
        }
    }

    // Funcionário: o que está no seu escopo
    async fn assignments(&self, identity: &Identity) -> Result<Assignments, AppError> {
        Ok(Assignments {
            projects: self.visible::<Project>(identity).await?,
            sub_projects: self.visible::<SubProject>(identity).await?,
            meetings: self.visible::<Meeting>(identity).await?,
            incidents: self.visible::<Incident>(identity).await?,
        })
    }

    async fn overview(&self, identity: &Identity) -> Result<Overview, AppError> {
        let mut overview = Overview::empty(identity.role);

        // 1. Contagens
        overview.projects = self.count::<Project>(identity).await?;
        overview.sub_projects = self.count::<SubProject>(identity).await?;
        overview.meetings = self.count::<Meeting>(identity).await?;
        overview.incidents = self.count::<Incident>(identity).await?;
        overview.documents = self.count::<Document>(identity).await?;
        overview.invoices = self.count::<Invoice>(identity).await?;
        overview.budget_lines = self.count::<BudgetLine>(identity).await?;
        overview.markets = self.count::<Market>(identity).await?;

        // 2. Totais
        overview.total_committed = self.sum::<Project>(identity, "budget").await?;
        overview.total_authorised = self.sum::<BudgetLine>(identity, "amount").await?;
        overview.total_invoiced = self.sum::<Invoice>(identity, "total_amount").await?;

        Ok(overview)
    }

    async fn visible<T: Resource>(&self, identity: &Identity) -> Result<Vec<T>, AppError> {
        if !AccessPolicy::allows(identity.role, T::KIND, Action::List) {
            return Ok(Vec::new());
        }
        let scope = self.access.scope(identity, &T::SCOPE).await?;
        self.repo.list_all::<T>(&ListFilter::scoped(&scope)).await
    }

    // None quando o papel não pode listar o recurso
    async fn count<T: Resource>(&self, identity: &Identity) -> Result<Option<i64>, AppError> {
        if !AccessPolicy::allows(identity.role, T::KIND, Action::List) {
            return Ok(None);
        }
        let scope = self.access.scope(identity, &T::SCOPE).await?;
        Ok(Some(self.repo.count::<T>(&ListFilter::scoped(&scope)).await?))
    }

    async fn sum<T: Resource>(&self, identity: &Identity, column: &'static str) -> Result<Option<Decimal>, AppError> {
        if !AccessPolicy::allows(identity.role, T::KIND, Action::List) {
            return Ok(None);
        }
        let scope = self.access.scope(identity, &T::SCOPE).await?;
        Ok(Some(self.repo.sum::<T>(column, &ListFilter::scoped(&scope)).await?))
    }
}
