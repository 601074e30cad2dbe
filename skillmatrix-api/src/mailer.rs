//! Outbound mail for the public contact and quote forms.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SkillMatrixConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub reply_to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay rejected the message with status {0}")]
    Rejected(u16),
    #[error("{0}")]
    Unavailable(String),
}

pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<String, MailError>> + Send + 'a>>;

/// Delivers a message and returns the relay's message id.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: OutgoingMail) -> SendFuture<'_>;
}

/// Managed-state handle for the configured mailer.
pub type MailerState = Box<dyn Mailer>;

pub fn from_config(config: &SkillMatrixConfig) -> MailerState {
    if config.mail_relay_url.trim().is_empty() {
        info!("No mail relay configured; contact messages will only be logged");
        Box::new(LogMailer)
    } else {
        Box::new(HttpRelayMailer::new(config))
    }
}

/// Posts messages as JSON to an HTTP mail relay.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    from: String,
    to: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    reply_to: &'a str,
    subject: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct RelayResponse {
    id: Option<String>,
}

impl HttpRelayMailer {
    pub fn new(config: &SkillMatrixConfig) -> Self {
        HttpRelayMailer {
            client: reqwest::Client::new(),
            url: config.mail_relay_url.clone(),
            token: config.mail_relay_token.clone(),
            from: config.mail_from.clone(),
            to: config.mail_to.clone(),
        }
    }
}

impl Mailer for HttpRelayMailer {
    fn send(&self, mail: OutgoingMail) -> SendFuture<'_> {
        Box::pin(async move {
            let mut request = self.client.post(&self.url).json(&RelayRequest {
                from: &self.from,
                to: &self.to,
                reply_to: &mail.reply_to,
                subject: &mail.subject,
                text: &mail.text,
            });
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(MailError::Rejected(status.as_u16()));
            }
            let body: RelayResponse = response.json().await?;
            Ok(body.id.unwrap_or_else(|| Uuid::new_v4().to_string()))
        })
    }
}

/// Logs messages instead of sending them.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: OutgoingMail) -> SendFuture<'_> {
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            info!(
                "Mail {} (reply-to {}): {} | {}",
                id, mail.reply_to, mail.subject, mail.text
            );
            Ok(id)
        })
    }
}

/// Keeps sent messages in memory; optionally fails every send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        RecordingMailer {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: OutgoingMail) -> SendFuture<'_> {
        Box::pin(async move {
            if self.fail {
                return Err(MailError::Unavailable("mail relay unavailable".to_string()));
            }
            let mut sent = self
                .sent
                .lock()
                .map_err(|_| MailError::Unavailable("mailbox poisoned".to_string()))?;
            sent.push(mail);
            Ok(format!("recorded-{}", sent.len()))
        })
    }
}
