//! Outgoing email: activation and password reset links.
//!
//! Delivery sits behind the [`Mailer`] trait. The HTTP transport posts a
//! JSON message to a transactional mail API, the log transport only writes
//! the message to the log, and [`MemoryMailer`] keeps messages in memory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::config::{MailConfig, MailTransport};
use crate::db::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.text,
            "Mail transport is 'log'; not delivering"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Dochazka/1.0")
            .build()
            .context("Failed to build mail HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let message = ApiMessage {
            from: &self.from,
            to: [&mail.to],
            subject: &mail.subject,
            text: &mail.text,
        };

        let mut request = self.client.post(&self.api_url).json(&message);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.context("Mail API request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Mail API error: HTTP {status}: {body}");
        }

        tracing::debug!(to = %mail.to, subject = %mail.subject, "Mail delivered");
        Ok(())
    }
}

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Most recent message addressed to `to`
    #[must_use]
    pub fn last_to(&self, to: &str) -> Option<OutgoingMail> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("Mail outbox lock poisoned"))?
            .push(mail);
        Ok(())
    }
}

pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    Ok(match config.transport {
        MailTransport::Log => Arc::new(LogMailer),
        MailTransport::Http => Arc::new(HttpMailer::new(config)?),
    })
}

/// Builds the text of the messages the auth flows send.
#[derive(Debug, Clone)]
pub struct MailComposer {
    base: Url,
}

impl MailComposer {
    pub fn new(public_url: &str) -> Result<Self> {
        let base = Url::parse(public_url)
            .with_context(|| format!("Invalid public URL: {public_url}"))?;
        Ok(Self { base })
    }

    fn link(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base.join(path).context("Failed to build link")?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    pub fn activation(&self, user: &User) -> Result<OutgoingMail> {
        let user_id = user.id.to_string();
        let link = self.link(
            "/activate",
            &[
                ("userid", user_id.as_str()),
                ("activate_token", user.activate_token.as_str()),
            ],
        )?;

        Ok(OutgoingMail {
            to: user.email.clone(),
            subject: "Activate your account".to_string(),
            text: format!(
                "Hello {},\n\nplease confirm your email address by opening the link below:\n\n{link}\n",
                user.username
            ),
        })
    }

    pub fn password_reset(&self, user: &User, token: &str) -> Result<OutgoingMail> {
        let user_id = user.id.to_string();
        let link = self.link(
            "/reset_password",
            &[("userid", user_id.as_str()), ("token", token)],
        )?;

        Ok(OutgoingMail {
            to: user.email.clone(),
            subject: "Password reset".to_string(),
            text: format!(
                "Hello {},\n\nsomeone asked to reset the password of your account. \
                 Open the link below to choose a new one:\n\n{link}\n\n\
                 If you did not ask for this, ignore this email.\n",
                user.username
            ),
        })
    }
}

/// Pulls the value of query parameter `name` out of the first link in `text`.
#[must_use]
pub fn link_param(text: &str, name: &str) -> Option<String> {
    let link = text.split_whitespace().find(|w| w.starts_with("http"))?;
    let url = Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: "jana@example.com".to_string(),
            username: "jana".to_string(),
            verified: false,
            activate_token: "abc123".to_string(),
            card_number: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_activation_mail_links_back() {
        let composer = MailComposer::new("https://dochazka.example.com/").unwrap();
        let mail = composer.activation(&user()).unwrap();

        assert_eq!(mail.to, "jana@example.com");
        assert!(
            mail.text
                .contains("https://dochazka.example.com/activate?userid=7&activate_token=abc123")
        );
        assert_eq!(link_param(&mail.text, "activate_token").as_deref(), Some("abc123"));
    }

    #[test]
    fn test_reset_mail_carries_token() {
        let composer = MailComposer::new("http://localhost:5000").unwrap();
        let mail = composer.password_reset(&user(), "tok").unwrap();

        assert_eq!(link_param(&mail.text, "userid").as_deref(), Some("7"));
        assert_eq!(link_param(&mail.text, "token").as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_memory_mailer_keeps_messages() {
        let mailer = MemoryMailer::new();
        mailer
            .send(OutgoingMail {
                to: "a@example.com".to_string(),
                subject: "one".to_string(),
                text: String::new(),
            })
            .await
            .unwrap();

        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.last_to("a@example.com").unwrap().subject, "one");
        assert!(mailer.last_to("b@example.com").is_none());
    }
}
