// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::{
        auth::Identity,
        resource::{Action, Resource, ResourceKind},
    },
    services::rbac_service::authorize,
};

/// 1. O que é protegido
pub trait Guarded: Send + Sync + 'static {
    const KIND: ResourceKind;
}

impl<T: Resource> Guarded for T {
    const KIND: ResourceKind = <T as Resource>::KIND;
}

// Usuários não passam pelo repositório genérico
pub struct Users;
impl Guarded for Users {
    const KIND: ResourceKind = ResourceKind::User;
}

/// 2. A ação exigida
pub trait ActionDef: Send + Sync + 'static {
    const ACTION: Action;
}

pub struct CanCreate;
impl ActionDef for CanCreate {
    const ACTION: Action = Action::Create;
}

pub struct CanUpdate;
impl ActionDef for CanUpdate {
    const ACTION: Action = Action::Update;
}

/// 3. O guardião. Roda antes do corpo ser lido: um papel sem a permissão
/// recebe 403 mesmo com um corpo inválido ou um upload enorme.
pub struct RequireAccess<K, A>(pub PhantomData<(K, A)>);

impl<K, A, S> FromRequestParts<S> for RequireAccess<K, A>
where
    K: Guarded,
    A: ActionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<Identity>().ok_or(AppError::InvalidToken)?;

        authorize(identity, K::KIND, A::ACTION)?;
        Ok(RequireAccess(PhantomData))
    }
}
