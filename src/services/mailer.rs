// src/services/mailer.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Envio do link de definição de senha.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_setup(&self, to: &str, name: &str, link: &str) -> anyhow::Result<()>;
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    to_addr: &'a str,
    subject: &'a str,
    html_body: String,
}

// API HTTP de e-mail (MAIL_API_URL / MAIL_API_KEY)
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_url, api_key }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_password_setup(&self, to: &str, name: &str, link: &str) -> anyhow::Result<()> {
        let payload = EmailPayload {
            to_addr: to,
            subject: "Set up your password",
            html_body: format!(
                "<p>Hello {},</p><p>Your account has been created. \
                 Set your password using the link below (valid for 20 minutes):</p>\
                 <p><a href=\"{}\">{}</a></p>",
                name, link, link
            ),
        };

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("Serviço de e-mail respondeu {}: {}", status, text);
        }
        Ok(())
    }
}

// Sem MAIL_API_URL: o link só aparece no log (desenvolvimento)
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_setup(&self, to: &str, _name: &str, link: &str) -> anyhow::Result<()> {
        tracing::debug!(%to, %link, "E-mail de definição de senha (não enviado)");
        Ok(())
    }
}
