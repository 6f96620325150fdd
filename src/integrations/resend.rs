//! Resend e-mail API client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::ResendConfig;
use crate::error::{Error, Result};

const RESEND_API_URL: &str = "https://api.resend.com";

#[derive(Clone, Debug, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

pub struct ResendClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl ResendClient {
    pub fn new(config: &ResendConfig) -> Self {
        Self::with_base_url(config, RESEND_API_URL)
    }

    pub fn with_base_url(config: &ResendConfig, base_url: &str) -> Self {
        Self { http: reqwest::Client::new(), api_key: config.api_key.clone(), base_url: base_url.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&email)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!("Resend rejected the message ({status}): {body}")));
        }
        tracing::info!(to = ?email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}
