//! Mailgun client for outgoing reminder mail.

use async_trait::async_trait;
use reqwest::Client;
use shared_types::ReminderTier;
use std::time::Duration;

use crate::config::MailConfig;
use crate::error::{RemoteFailure, ReminderError, ReminderResult};

/// A plain-text email ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub tier: ReminderTier,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Mail delivery contract
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> ReminderResult<()>;
}

pub struct MailgunClient {
    client: Client,
    base_url: String,
    api_key: String,
    domain: String,
}

impl MailgunClient {
    pub fn new(config: &MailConfig, timeout: Duration) -> ReminderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReminderError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            domain: config.domain.clone(),
        })
    }
}

#[async_trait]
impl Mailer for MailgunClient {
    async fn send(&self, email: &OutgoingEmail) -> ReminderResult<()> {
        let url = format!("{}/v3/{}/messages", self.base_url, self.domain);
        let context = format!("send {} mail {:?}", email.tier.as_str(), email.subject);

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", email.from.as_str()),
                ("to", email.to.as_str()),
                ("subject", email.subject.as_str()),
                ("text", email.text.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ReminderError::update(context.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReminderError::update(
                context,
                RemoteFailure::Status { status, body },
            ));
        }

        tracing::debug!("Mail accepted: {}", email.subject);
        Ok(())
    }
}
