// src/services/notification_service.rs

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    db::{AssignmentRepository, NotificationRepository},
    models::{
        auth::Identity,
        notification::{Announcement, Audience, DispatchReport, Notification, NotificationDraft},
        resource::{Action, ResourceKind},
    },
    services::rbac_service::authorize,
};

// =============================================================================
//  PORTAS
// =============================================================================

/// Onde as notificações são gravadas e de onde vêm destinatários e tokens.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, recipient: Uuid, draft: &NotificationDraft) -> Result<(), AppError>;
    async fn device_tokens(&self, recipients: &[Uuid]) -> Result<Vec<String>, AppError>;
    async fn resolve(&self, audience: &Audience) -> Result<Vec<Uuid>, AppError>;
}

/// Gateway de push (FCM ou compatível).
#[async_trait]
pub trait PushClient: Send + Sync {
    async fn send(&self, device_token: &str, draft: &NotificationDraft) -> anyhow::Result<()>;
}

// =============================================================================
//  DISPATCHER
// =============================================================================

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    push: Arc<dyn PushClient>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn NotificationStore>, push: Arc<dyn PushClient>) -> Self {
        Self { store, push }
    }

    /// Uma linha por destinatário, depois push para quem tem a linha gravada e um token.
    /// Falhas individuais são logadas e não interrompem as outras.
    pub async fn notify(&self, draft: &NotificationDraft, recipients: &[Uuid]) -> DispatchReport {
        let mut report = DispatchReport::default();

        // 1. Persiste
        let mut persisted = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            match self.store.insert(*recipient, draft).await {
                Ok(()) => persisted.push(*recipient),
                Err(e) => tracing::warn!(%recipient, "Falha ao gravar notificação: {}", e),
            }
        }
        report.persisted = persisted.len();

        // 2. Tokens de push
        let tokens = self.device_tokens(&persisted).await;
        if tokens.is_empty() {
            tracing::debug!("Nenhum token de push para os destinatários");
            return report;
        }

        // 3. Envia em paralelo: um gateway lento não segura os demais
        let mut sends = JoinSet::new();
        for token in tokens {
            let push = self.push.clone();
            let draft = draft.clone();
            sends.spawn(async move { push.send(&token, &draft).await });
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok(Ok(())) => report.pushed += 1,
                Ok(Err(e)) => {
                    report.push_failures += 1;
                    tracing::warn!("Falha no envio de push: {:#}", e);
                }
                Err(e) => {
                    report.push_failures += 1;
                    tracing::warn!("Task de push interrompida: {}", e);
                }
            }
        }

        report
    }

    // Em lote; se o lote falhar, um destinatário por vez.
    async fn device_tokens(&self, recipients: &[Uuid]) -> Vec<String> {
        if recipients.is_empty() {
            return Vec::new();
        }

        match self.store.device_tokens(recipients).await {
            Ok(tokens) => return tokens,
            Err(e) => tracing::warn!("Falha ao buscar tokens de push em lote: {}", e),
        }

        let mut tokens = Vec::new();
        for recipient in recipients {
            match self.store.device_tokens(std::slice::from_ref(recipient)).await {
                Ok(found) => tokens.extend(found),
                Err(e) => tracing::warn!(%recipient, "Falha ao buscar token de push: {}", e),
            }
        }
        tokens
    }

    pub async fn announce(&self, announcement: Announcement) -> DispatchReport {
        let mut recipients = BTreeSet::new();
        for audience in &announcement.audience {
            match self.store.resolve(audience).await {
                Ok(ids) => recipients.extend(ids),
                Err(e) => tracing::warn!(?audience, "Falha ao resolver destinatários: {}", e),
            }
        }

        let recipients: Vec<Uuid> = recipients.into_iter().collect();
        let report = self.notify(&announcement.draft, &recipients).await;

        tracing::info!(
            kind = announcement.draft.kind.as_str(),
            recipients = recipients.len(),
            persisted = report.persisted,
            pushed = report.pushed,
            push_failures = report.push_failures,
            "📣 Notificação enviada"
        );
        report
    }

    /// Dispara em segundo plano; a requisição não espera nem falha por causa disso.
    pub fn announce_detached(&self, announcement: Announcement) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.announce(announcement).await;
        });
    }
}

// =============================================================================
//  CAIXA DE ENTRADA
// =============================================================================

// O destinatário só enxerga e altera as próprias notificações.
#[derive(Clone)]
pub struct NotificationInbox {
    repo: NotificationRepository,
}

impl NotificationInbox {
    pub fn new(repo: NotificationRepository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, identity: &Identity, page: PageRequest) -> Result<(Vec<Notification>, i64), AppError> {
        authorize(identity, ResourceKind::Notification, Action::List)?;
        let rows = self.repo.list_for(identity.user_id, page).await?;
        let count = self.repo.count_for(identity.user_id).await?;
        Ok((rows, count))
    }

    // Notificação de outro usuário responde 404, como se não existisse
    pub async fn mark_read(&self, identity: &Identity, id: Uuid) -> Result<Notification, AppError> {
        authorize(identity, ResourceKind::Notification, Action::Update)?;
        self.repo
            .mark_read(identity.user_id, id)
            .await?
            .ok_or(AppError::NotFound("Notificação"))
    }

    pub async fn mark_all_read(&self, identity: &Identity) -> Result<u64, AppError> {
        authorize(identity, ResourceKind::Notification, Action::Update)?;
        self.repo.mark_all_read(identity.user_id).await
    }
}

// =============================================================================
//  ADAPTADORES
// =============================================================================

// Postgres: notificações + alocações
pub struct PgNotificationStore {
    notifications: NotificationRepository,
    assignments: AssignmentRepository,
}

impl PgNotificationStore {
    pub fn new(notifications: NotificationRepository, assignments: AssignmentRepository) -> Self {
        Self { notifications, assignments }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, recipient: Uuid, draft: &NotificationDraft) -> Result<(), AppError> {
        self.notifications.insert(recipient, draft).await
    }

    async fn device_tokens(&self, recipients: &[Uuid]) -> Result<Vec<String>, AppError> {
        self.notifications.device_tokens(recipients).await
    }

    async fn resolve(&self, audience: &Audience) -> Result<Vec<Uuid>, AppError> {
        match audience {
            Audience::Admins => self.assignments.admin_ids().await,
            Audience::ProjectStaff(project_id) => self.assignments.project_staff(*project_id).await,
            Audience::User(id) => Ok(vec![*id]),
        }
    }
}

#[derive(Serialize)]
struct PushNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct PushData<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    link: &'a str,
    click_action: &'a str,
}

#[derive(Serialize)]
struct PushMessage<'a> {
    token: &'a str,
    notification: PushNotification<'a>,
    data: PushData<'a>,
}

#[derive(Serialize)]
struct PushPayload<'a> {
    message: PushMessage<'a>,
}

pub const PUSH_TIMEOUT: Duration = Duration::from_secs(30);

// Envia no formato de mensagem do FCM v1 para PUSH_API_URL
pub struct HttpPushClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpPushClient {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self::with_timeout(api_url, api_key, PUSH_TIMEOUT)
    }

    pub fn with_timeout(api_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            tracing::warn!("Cliente HTTP de push sem timeout: {}", e);
            Client::new()
        });
        Self { client, api_url, api_key }
    }
}

#[async_trait]
impl PushClient for HttpPushClient {
    async fn send(&self, device_token: &str, draft: &NotificationDraft) -> anyhow::Result<()> {
        let payload = PushPayload {
            message: PushMessage {
                token: device_token,
                notification: PushNotification {
                    title: &draft.title,
                    body: &draft.body,
                },
                data: PushData {
                    kind: draft.kind.as_str(),
                    link: draft.link.as_deref().unwrap_or(""),
                    click_action: "FLUTTER_NOTIFICATION_CLICK",
                },
            },
        };

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("Gateway de push respondeu {}: {}", status, text);
        }
        Ok(())
    }
}

// Sem gateway configurado: só registra no log
pub struct NoopPushClient;

#[async_trait]
impl PushClient for NoopPushClient {
    async fn send(&self, _device_token: &str, draft: &NotificationDraft) -> anyhow::Result<()> {
        tracing::debug!(title = %draft.title, "Push desativado (PUSH_API_URL ausente)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationKind;
    use std::{collections::HashMap, sync::Mutex};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeStore {
        rows: Mutex<Vec<Uuid>>,
        tokens: HashMap<Uuid, String>,
        failing: Option<Uuid>,
        admins: Vec<Uuid>,
        // Consulta com mais de um destinatário falha
        batch_broken: bool,
        lookups: Mutex<usize>,
    }

    #[async_trait]
    impl NotificationStore for FakeStore {
        async fn insert(&self, recipient: Uuid, _draft: &NotificationDraft) -> Result<(), AppError> {
            if self.failing == Some(recipient) {
                return Err(AppError::InternalServerError(anyhow::anyhow!("insert falhou")));
            }
            self.rows.lock().unwrap().push(recipient);
            Ok(())
        }

        async fn device_tokens(&self, recipients: &[Uuid]) -> Result<Vec<String>, AppError> {
            *self.lookups.lock().unwrap() += 1;
            if self.batch_broken && recipients.len() > 1 {
                return Err(AppError::InternalServerError(anyhow::anyhow!("consulta em lote falhou")));
            }
            Ok(recipients.iter().filter_map(|id| self.tokens.get(id).cloned()).collect())
        }

        async fn resolve(&self, audience: &Audience) -> Result<Vec<Uuid>, AppError> {
            Ok(match audience {
                Audience::Admins => self.admins.clone(),
                Audience::ProjectStaff(_) => vec![],
                Audience::User(id) => vec![*id],
            })
        }
    }

    #[derive(Default)]
    struct FakePush {
        sent: Mutex<Vec<String>>,
        reject: Option<String>,
    }

    #[async_trait]
    impl PushClient for FakePush {
        async fn send(&self, device_token: &str, _draft: &NotificationDraft) -> anyhow::Result<()> {
            if self.reject.as_deref() == Some(device_token) {
                anyhow::bail!("token inválido");
            }
            self.sent.lock().unwrap().push(device_token.to_string());
            Ok(())
        }
    }

    // "preso" só responde quando o teste libera o portão
    struct GatedPush {
        gate: Arc<Notify>,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PushClient for GatedPush {
        async fn send(&self, device_token: &str, _draft: &NotificationDraft) -> anyhow::Result<()> {
            if device_token == "preso" {
                self.gate.notified().await;
            }
            self.sent.lock().unwrap().push(device_token.to_string());
            Ok(())
        }
    }

    fn draft() -> NotificationDraft {
        NotificationDraft {
            title: "New Project Created".into(),
            body: "A new project 'Barrage' has been created".into(),
            kind: NotificationKind::NewProject,
            link: Some("/projects/1".into()),
        }
    }

    #[tokio::test]
    async fn one_row_per_recipient_and_push_only_with_token() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let store = Arc::new(FakeStore {
            tokens: HashMap::from([(u1, "token-u1".to_string())]),
            ..Default::default()
        });
        let push = Arc::new(FakePush::default());
        let dispatcher = NotificationDispatcher::new(store.clone(), push.clone());

        let report = dispatcher.notify(&draft(), &[u1, u2]).await;

        assert_eq!(store.rows.lock().unwrap().as_slice(), &[u1, u2]);
        assert_eq!(push.sent.lock().unwrap().as_slice(), &["token-u1".to_string()]);
        assert_eq!(report, DispatchReport { persisted: 2, pushed: 1, push_failures: 0 });
    }

    #[tokio::test]
    async fn failures_are_isolated_per_recipient() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let u3 = Uuid::new_v4();
        let store = Arc::new(FakeStore {
            tokens: HashMap::from([(u2, "bad".to_string()), (u3, "good".to_string())]),
            failing: Some(u1),
            ..Default::default()
        });
        let push = Arc::new(FakePush { reject: Some("bad".into()), ..Default::default() });
        let dispatcher = NotificationDispatcher::new(store.clone(), push.clone());

        let report = dispatcher.notify(&draft(), &[u1, u2, u3]).await;

        assert_eq!(report, DispatchReport { persisted: 2, pushed: 1, push_failures: 1 });
        assert_eq!(push.sent.lock().unwrap().as_slice(), &["good".to_string()]);
    }

    #[tokio::test]
    async fn no_tokens_means_no_push() {
        let store = Arc::new(FakeStore::default());
        let push = Arc::new(FakePush::default());
        let dispatcher = NotificationDispatcher::new(store, push.clone());

        let report = dispatcher.notify(&draft(), &[Uuid::new_v4()]).await;

        assert_eq!(report.persisted, 1);
        assert!(push.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn announce_deduplicates_overlapping_audiences() {
        let admin = Uuid::new_v4();
        let store = Arc::new(FakeStore { admins: vec![admin], ..Default::default() });
        let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(NoopPushClient));

        let report = dispatcher
            .announce(Announcement {
                draft: draft(),
                audience: vec![Audience::Admins, Audience::User(admin)],
            })
            .await;

        assert_eq!(report.persisted, 1);
        assert_eq!(store.rows.lock().unwrap().as_slice(), &[admin]);
    }

    #[tokio::test]
    async fn recipient_whose_row_failed_gets_no_push() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let store = Arc::new(FakeStore {
            tokens: HashMap::from([(u1, "token-u1".to_string()), (u2, "token-u2".to_string())]),
            failing: Some(u1),
            ..Default::default()
        });
        let push = Arc::new(FakePush::default());
        let dispatcher = NotificationDispatcher::new(store, push.clone());

        let report = dispatcher.notify(&draft(), &[u1, u2]).await;

        assert_eq!(report, DispatchReport { persisted: 1, pushed: 1, push_failures: 0 });
        assert_eq!(push.sent.lock().unwrap().as_slice(), &["token-u2".to_string()]);
    }

    #[tokio::test]
    async fn broken_batch_lookup_falls_back_to_each_recipient() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let store = Arc::new(FakeStore {
            tokens: HashMap::from([(u1, "token-u1".to_string()), (u2, "token-u2".to_string())]),
            batch_broken: true,
            ..Default::default()
        });
        let push = Arc::new(FakePush::default());
        let dispatcher = NotificationDispatcher::new(store.clone(), push.clone());

        let report = dispatcher.notify(&draft(), &[u1, u2]).await;

        assert_eq!(report, DispatchReport { persisted: 2, pushed: 2, push_failures: 0 });
        // 1 em lote + 2 individuais
        assert_eq!(*store.lookups.lock().unwrap(), 3);
        let mut sent = push.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(sent, vec!["token-u1".to_string(), "token-u2".to_string()]);
    }

    #[tokio::test]
    async fn stuck_gateway_call_does_not_hold_back_other_recipients() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let store = Arc::new(FakeStore {
            tokens: HashMap::from([(u1, "preso".to_string()), (u2, "rapido".to_string())]),
            ..Default::default()
        });
        let gate = Arc::new(Notify::new());
        let push = Arc::new(GatedPush { gate: gate.clone(), sent: Mutex::new(Vec::new()) });
        let dispatcher = NotificationDispatcher::new(store, push.clone());

        let running = tokio::spawn(async move { dispatcher.notify(&draft(), &[u1, u2]).await });

        let mut delivered = false;
        for _ in 0..200 {
            if push.sent.lock().unwrap().iter().any(|t| t == "rapido") {
                delivered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(delivered, "o push rápido esperou pelo preso");
        assert!(!running.is_finished());

        gate.notify_one();
        let report = running.await.unwrap();
        assert_eq!(report.pushed, 2);
    }

    #[tokio::test]
    async fn gateway_that_never_answers_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Aceita e segura a conexão sem responder
        let _holder = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let client = HttpPushClient::with_timeout(
            format!("http://{}/send", addr),
            None,
            Duration::from_millis(300),
        );
        let started = std::time::Instant::now();
        let result = client.send("token", &draft()).await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
