//! Transactional email dispatch.
//!
//! A [`Mailer`] owns at most one [`EmailTransport`]. Callers see the same contract
//! whichever transport is configured: a provider message id on success, or one of
//! the [`EmailError`] conditions.

pub mod resend;
pub mod smtp;

use async_trait::async_trait;
use lettre::{Address, message::Mailbox};
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{EmailConfig, TransportConfig};

pub use resend::ResendTransport;
pub use smtp::SmtpTransport;

#[derive(Debug, Error)]
pub enum EmailError {
    /// No transport credentials are configured; nothing was sent.
    #[error("Email service not configured. Set RESEND_API_KEY or SMTP credentials in environment variables.")]
    NotConfigured,
    /// The provider rejected the configured credentials.
    #[error("Email authentication failed: {0}")]
    Authentication(String),
    /// Any other failure to build or deliver the message.
    #[error("Failed to send email: {0}")]
    Transport(String),
}

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub name: String,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

impl OutgoingEmail {
    /// The recipient mailbox, with the display name when one is given.
    pub fn recipient(&self) -> Result<Mailbox, EmailError> {
        mailbox(&self.name, &self.to, "to")
    }
}

/// The identity messages are sent from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub name: String,
    pub address: String,
}

impl Sender {
    pub fn mailbox(&self) -> Result<Mailbox, EmailError> {
        mailbox(&self.name, &self.address, "from")
    }
}

/// Builds an RFC 5322 mailbox. Display names are quoted as needed when rendered.
fn mailbox(name: &str, address: &str, role: &str) -> Result<Mailbox, EmailError> {
    let address = address
        .trim()
        .parse::<Address>()
        .map_err(|e| EmailError::Transport(format!("Invalid {role} email: {e}")))?;
    let name = Some(name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Ok(Mailbox::new(name, address))
}

/// A way of handing a message to an email provider.
#[async_trait]
pub trait EmailTransport: Send + Sync + Debug {
    /// Short name reported by the service banner.
    fn name(&self) -> &'static str;

    /// Delivers `email` from `from`, returning the provider's message id if it reports one.
    async fn send(&self, from: &Sender, email: &OutgoingEmail) -> Result<Option<String>, EmailError>;
}

#[derive(Debug, Clone)]
pub struct Mailer {
    transport: Option<Arc<dyn EmailTransport>>,
    sender: Sender,
}

impl Mailer {
    pub fn new(transport: Option<Arc<dyn EmailTransport>>, sender: Sender) -> Self {
        Self { transport, sender }
    }

    /// A mailer with no transport: every send reports [`EmailError::NotConfigured`].
    pub fn disabled(sender: Sender) -> Self {
        Self::new(None, sender)
    }

    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        let sender = Sender {
            name: config.sender_name.clone(),
            address: config.sender_address.clone(),
        };

        let transport: Option<Arc<dyn EmailTransport>> = match &config.transport {
            None => None,
            Some(TransportConfig::Resend { api_key, api_url }) => {
                Some(Arc::new(ResendTransport::new(api_key.expose(), api_url)?))
            },
            Some(TransportConfig::Smtp { host, port, username, password }) => {
                Some(Arc::new(SmtpTransport::new(host, *port, username, password.expose())?))
            },
        };

        Ok(Self::new(transport, sender))
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Name of the configured transport, if any.
    pub fn transport_name(&self) -> Option<&'static str> {
        self.transport
            .as_ref()
            .map(|transport| transport.name())
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>, EmailError> {
        let transport = self.transport
            .as_ref()
            .ok_or(EmailError::NotConfigured)?;

        info!(to = %email.to, subject = %email.subject, transport = transport.name(), "sending email");

        transport
            .send(&self.sender, email)
            .await
            .inspect_err(|e| warn!(to = %email.to, error = %e, "email delivery failed"))
    }
}
