// src/services/resource_service.rs

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    db::{ListFilter, ResourceRepository},
    models::{
        auth::Identity,
        resource::{Action, DateWindow, ParentLinks, Record, Resource, WorkflowMode},
    },
    services::{
        notification_service::NotificationDispatcher,
        rbac_service::{authorize, AccessService},
    },
};

// CRUD genérico: permissão -> escopo -> validação -> escrita -> notificação.
#[derive(Clone)]
pub struct ResourceService {
    pool: PgPool,
    repo: ResourceRepository,
    access: AccessService,
    notifier: NotificationDispatcher,
    workflow: WorkflowMode,
}

impl ResourceService {
    pub fn new(
        pool: PgPool,
        repo: ResourceRepository,
        access: AccessService,
        notifier: NotificationDispatcher,
        workflow: WorkflowMode,
    ) -> Self {
        Self { pool, repo, access, notifier, workflow }
    }

    pub fn repo(&self) -> &ResourceRepository {
        &self.repo
    }

    pub async fn list<T: Resource>(
        &self,
        identity: &Identity,
        parent: Option<(&'static str, Uuid)>,
        page: PageRequest,
    ) -> Result<(Vec<T>, i64), AppError> {
        authorize(identity, T::KIND, Action::List)?;

        let scope = self.access.scope(identity, &T::SCOPE).await?;
        let filter = ListFilter { scope: &scope, parent };

        let rows = self.repo.list::<T>(&filter, page).await?;
        let count = self.repo.count::<T>(&filter).await?;
        Ok((rows, count))
    }

    pub async fn get<T: Resource>(&self, identity: &Identity, id: Uuid) -> Result<T, AppError> {
        authorize(identity, T::KIND, Action::Read)?;
        self.load_in_scope::<T>(identity, id).await
    }

    /// Tudo que antecede o INSERT. Também usado pelo upload de documentos.
    pub async fn prepare_create<T: Resource>(
        &self,
        identity: &Identity,
        mut fields: T::Fields,
    ) -> Result<T::Fields, AppError> {
        // 1. Papel
        authorize(identity, T::KIND, Action::Create)?;

        // 2. Campos
        fields.stamp(identity);
        fields.validate()?;

        // 3. O pai precisa estar no escopo de quem cria
        let keys = fields.scope_keys();
        if !keys.is_empty() {
            let scope = self.access.scope(identity, &T::SCOPE).await?;
            if !scope.permits(&keys) {
                return Err(AppError::Forbidden);
            }
        }

        // 4. Regras que dependem do pai
        self.check_links(fields.links()).await?;
        let window = self.parent_window(&fields).await?;
        fields.check(window.as_ref())?;

        Ok(fields)
    }

    pub async fn create<T: Resource>(&self, identity: &Identity, fields: T::Fields) -> Result<T, AppError> {
        let fields = self.prepare_create::<T>(identity, fields).await?;

        let mut conn = self.pool.acquire().await?;
        let created = self.repo.insert::<T>(&mut conn, fields).await?;

        tracing::info!(id = %created.id(), user = %identity.user_id, "{} criado", T::LABEL);
        self.announce(&created);
        Ok(created)
    }

    /// Atualização parcial: o patch é mesclado no registro atual e o resultado é validado inteiro.
    pub async fn update<T: Resource>(&self, identity: &Identity, id: Uuid, patch: Value) -> Result<T, AppError> {
        authorize(identity, T::KIND, Action::Update)?;

        if !patch.is_object() {
            return Err(AppError::InvalidInput("O corpo deve ser um objeto JSON.".to_string()));
        }

        let current = self.load_in_scope::<T>(identity, id).await?;

        // 1. Mescla
        let mut merged = serde_json::to_value(current.fields())
            .map_err(|e| anyhow::anyhow!("Falha ao serializar {}: {}", T::LABEL, e))?;
        merge_patch(&mut merged, patch);

        let fields: T::Fields = serde_json::from_value(merged)
            .map_err(|e| AppError::InvalidInput(format!("Dados inválidos: {}", e)))?;
        fields.validate()?;

        // 2. Não pode ser movido para fora do escopo
        let keys = fields.scope_keys();
        if !keys.is_empty() {
            let scope = self.access.scope(identity, &T::SCOPE).await?;
            if !scope.permits(&keys) {
                return Err(AppError::Forbidden);
            }
        }

        // 3. Regras
        self.check_links(fields.links()).await?;
        let window = self.parent_window(&fields).await?;
        fields.check(window.as_ref())?;
        fields.check_transition(current.fields(), self.workflow)?;

        // 4. A nova janela ainda contém o que depende dela
        if let (Some(source), Some(own)) = (current.window_key(), fields.own_window()) {
            self.repo.child_span(source).await?.ensure_within(&own)?;
        }

        // 5. Grava
        let mut conn = self.pool.acquire().await?;
        let updated = self.repo.update::<T>(&mut conn, id, fields).await?;
        Ok(updated)
    }

    /// Remove e devolve o registro removido.
    pub async fn delete<T: Resource>(&self, identity: &Identity, id: Uuid) -> Result<T, AppError> {
        authorize(identity, T::KIND, Action::Delete)?;

        let current = self.load_in_scope::<T>(identity, id).await?;
        if !self.repo.delete::<T>(id).await? {
            return Err(AppError::NotFound(T::LABEL));
        }

        tracing::info!(%id, user = %identity.user_id, "{} removido", T::LABEL);
        Ok(current)
    }

    pub fn announce<T: Resource>(&self, created: &T) {
        if let Some(announcement) = created.announce() {
            self.notifier.announce_detached(announcement);
        }
    }

    // 404 se não existe, 403 se existe fora do escopo
    async fn load_in_scope<T: Resource>(&self, identity: &Identity, id: Uuid) -> Result<T, AppError> {
        let row = self
            .repo
            .find::<T>(id)
            .await?
            .ok_or(AppError::NotFound(T::LABEL))?;

        let scope = self.access.scope(identity, &T::SCOPE).await?;
        if !scope.permits(&row.scope_keys()) {
            return Err(AppError::Forbidden);
        }
        Ok(row)
    }

    // Sous-projet, marché e AP precisam ser do mesmo projeto que o registro aponta.
    async fn check_links(&self, links: ParentLinks) -> Result<(), AppError> {
        if !links.needs_check() {
            return Ok(());
        }

        let mut owner = links.project;
        let references = [
            ("sub_projects", "id_sous_projet", links.sub_project),
            ("markets", "id_marche", links.market),
            ("budget_lines", "id_ap", links.budget_line),
        ];

        for (table, field, id) in references {
            let Some(id) = id else {
                continue;
            };
            let parent = self
                .repo
                .owner_project(table, id)
                .await?
                .ok_or_else(|| AppError::field(field, "not_found", "O registro informado não existe."))?;

            match owner {
                Some(project) if project != parent => {
                    return Err(AppError::field(
                        field,
                        "project_mismatch",
                        "O registro informado pertence a outro projeto.",
                    ));
                }
                _ => owner = Some(parent),
            }
        }
        Ok(())
    }

    async fn parent_window<F: Record>(&self, fields: &F) -> Result<Option<DateWindow>, AppError> {
        let Some(source) = fields.window_source() else {
            return Ok(None);
        };

        match self.repo.window(source).await? {
            Some(window) => Ok(Some(window)),
            None => Err(AppError::field(
                "id_projet",
                "not_found",
                "O projeto ou sous-projet informado não existe.",
            )),
        }
    }
}

/// JSON Merge Patch (RFC 7386): `null` remove a chave, objetos são mesclados recursivamente.
pub fn merge_patch(target: &mut Value, patch: Value) {
    let Value::Object(patch) = patch else {
        *target = patch;
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }

    if let Value::Object(map) = target {
        for (key, value) in patch {
            if value.is_null() {
                map.remove(&key);
            } else {
                merge_patch(map.entry(key).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::{ProjectFields, ProjectStatus};
    use serde_json::json;

    #[test]
    fn merge_overwrites_only_given_keys() {
        let mut target = json!({"nom_projet": "A", "date_debut": "2025-01-01", "region": "Oran"});
        merge_patch(&mut target, json!({"nom_projet": "B", "region": null}));
        assert_eq!(target, json!({"nom_projet": "B", "date_debut": "2025-01-01"}));
    }

    #[test]
    fn merged_record_is_revalidated_as_a_whole() {
        let current = ProjectFields {
            name: "Barrage".into(),
            description: String::new(),
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            status: ProjectStatus::Planned,
            lead_id: None,
            budget: None,
            region: None,
        };

        // Só a data de início muda, mas passa do fim: o registro inteiro fica inválido.
        let mut merged = serde_json::to_value(&current).unwrap();
        merge_patch(&mut merged, json!({"date_debut": "2026-02-01"}));
        let fields: ProjectFields = serde_json::from_value(merged).unwrap();

        assert_eq!(fields.name, "Barrage");
        assert!(fields.check(None).is_err());
    }
}
