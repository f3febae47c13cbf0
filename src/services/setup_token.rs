// src/services/setup_token.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::common::error::AppError;

pub const TOKEN_PREFIX: &str = "pwd_setup_";
pub const TOKEN_TTL_MINUTES: i64 = 20;

#[derive(Debug, Clone, Copy)]
struct Entry {
    user_id: Uuid,
    issued_at: DateTime<Utc>,
}

// Tokens de definição de senha, em memória do processo.
// Consumir é checar-e-remover sob o mesmo lock: um token vale uma única vez.
#[derive(Clone, Default)]
pub struct SetupTokenStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl SetupTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
        // 32 caracteres hexadecimais
        let token = Uuid::new_v4().simple().to_string();

        let mut entries = self.lock()?;
        entries.retain(|_, entry| !is_expired(entry, now));
        entries.insert(key(&token), Entry { user_id, issued_at: now });
        Ok(token)
    }

    pub fn consume(&self, token: &str) -> Result<Uuid, AppError> {
        self.consume_at(token, Utc::now())
    }

    pub fn consume_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AppError> {
        let entry = self
            .lock()?
            .remove(&key(token))
            .ok_or(AppError::InvalidOrExpiredToken)?;

        if is_expired(&entry, now) {
            return Err(AppError::InvalidOrExpiredToken);
        }
        Ok(entry.user_id)
    }

    /// Invalida todos os tokens pendentes de um usuário. Devolve quantos havia.
    pub fn revoke_user(&self, user_id: Uuid) -> Result<usize, AppError> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.user_id != user_id);
        Ok(before - entries.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::InternalServerError(anyhow::anyhow!("Lock dos tokens envenenado")))
    }
}

fn key(token: &str) -> String {
    format!("{}{}", TOKEN_PREFIX, token)
}

fn is_expired(entry: &Entry, now: DateTime<Utc>) -> bool {
    now - entry.issued_at > Duration::minutes(TOKEN_TTL_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_thirty_two_chars() {
        let store = SetupTokenStore::new();
        let token = store.issue(Uuid::new_v4()).unwrap();
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn token_is_accepted_exactly_once() {
        let store = SetupTokenStore::new();
        let user = Uuid::new_v4();
        let token = store.issue(user).unwrap();

        assert_eq!(store.consume(&token).unwrap(), user);
        assert!(matches!(store.consume(&token), Err(AppError::InvalidOrExpiredToken)));
    }

    #[test]
    fn token_older_than_twenty_minutes_is_rejected() {
        let store = SetupTokenStore::new();
        let issued = Utc::now();
        let token = store.issue_at(Uuid::new_v4(), issued).unwrap();

        let later = issued + Duration::minutes(21);
        assert!(matches!(store.consume_at(&token, later), Err(AppError::InvalidOrExpiredToken)));
    }

    #[test]
    fn token_within_window_is_accepted() {
        let store = SetupTokenStore::new();
        let issued = Utc::now();
        let user = Uuid::new_v4();
        let token = store.issue_at(user, issued).unwrap();

        assert_eq!(store.consume_at(&token, issued + Duration::minutes(19)).unwrap(), user);
    }

    #[test]
    fn revoking_a_user_drops_only_their_tokens() {
        let store = SetupTokenStore::new();
        let removed_user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let first = store.issue(removed_user).unwrap();
        let second = store.issue(removed_user).unwrap();
        let kept = store.issue(other).unwrap();

        assert_eq!(store.revoke_user(removed_user).unwrap(), 2);
        assert!(matches!(store.consume(&first), Err(AppError::InvalidOrExpiredToken)));
        assert!(matches!(store.consume(&second), Err(AppError::InvalidOrExpiredToken)));
        assert_eq!(store.consume(&kept).unwrap(), other);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = SetupTokenStore::new();
        assert!(matches!(store.consume("nao-existe"), Err(AppError::InvalidOrExpiredToken)));
    }
}
