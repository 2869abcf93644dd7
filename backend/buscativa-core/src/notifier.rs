// src/notifier.rs
use async_trait::async_trait;
use lettre::message::{header, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{SmtpRelay, SmtpSettings};
use crate::ledger::AbsenceRecord;

pub const SUBJECT_PREFIX: &str = "[BUSCATIVA] Falta registrada: ";

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Failed to build email: {0}")]
    Build(String),
    #[error("SMTP relay error: {0}")]
    Relay(String),
    #[error("Failed to send email: {0}")]
    Send(String),
}

/// How a notification attempt ended. The record is persisted in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    SkippedConfig,
    Failed(String),
}

impl NotifyOutcome {
    pub fn delivered(&self) -> bool {
        matches!(self, NotifyOutcome::Delivered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// A composed notification, independent of the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub body: String,
    pub attachment: Option<EmailAttachment>,
}

impl OutgoingEmail {
    pub fn to_message(&self, from: &str, to: &str) -> Result<Message, NotificationError> {
        let from: Mailbox = parse_mailbox(from)?;
        let to: Mailbox = parse_mailbox(to)?;

        let text = SinglePart::builder()
            .header(header::ContentType::TEXT_PLAIN)
            .body(self.body.clone());

        let builder = Message::builder().from(from).to(to).subject(self.subject.clone());
        let message = match &self.attachment {
            Some(attachment) => {
                let csv_type = header::ContentType::parse("text/csv")
                    .map_err(|e| NotificationError::Build(e.to_string()))?;
                builder.multipart(
                    MultiPart::mixed().singlepart(text).singlepart(
                        Attachment::new(attachment.file_name.clone())
                            .body(attachment.content.clone(), csv_type),
                    ),
                )
            }
            None => builder.singlepart(text),
        };
        message.map_err(|e| NotificationError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| NotificationError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Builds the notification for `record`, attaching the ledger at `ledger_path` when readable.
pub fn compose_email(record: &AbsenceRecord, ledger_path: &Path) -> OutgoingEmail {
    let subject = format!("{}{}", SUBJECT_PREFIX, record.student_name);
    let body = format!(
        "Monitor: {} ({})\n\
         Turno: {}\n\
         Aluno: {}\n\
         Data da falta: {}\n\
         Motivo: {}\n\
         Registrado em: {}\n\n\
         Arquivo mensal anexo.",
        record.monitor_name,
        record.monitor_username,
        record.monitor_shift,
        record.student_name,
        record.absence_date,
        record.reason,
        record.timestamp(),
    );

    let attachment = match fs::read(ledger_path) {
        Ok(content) => Some(EmailAttachment {
            file_name: ledger_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "faltas.csv".to_string()),
            content,
        }),
        Err(e) => {
            warn!(
                "Could not attach ledger {}: {}. Sending without attachment.",
                ledger_path.display(),
                e
            );
            None
        }
    };

    OutgoingEmail {
        subject,
        body,
        attachment,
    }
}

// --- Transport ---

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, relay: &SmtpRelay, email: &OutgoingEmail) -> Result<(), NotificationError>;
}

/// Sends through the configured relay: STARTTLS required, PLAIN auth, one connection per message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpMailer;

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, relay: &SmtpRelay, email: &OutgoingEmail) -> Result<(), NotificationError> {
        let message = email.to_message(&relay.username, &relay.recipient)?;

        let creds = Credentials::new(relay.username.clone(), relay.password.clone());
        let tls_parameters = TlsParameters::new(relay.host.clone())
            .map_err(|e| NotificationError::Relay(format!("TLS error: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&relay.host)
            .map_err(|e| NotificationError::Relay(e.to_string()))?
            .port(relay.port)
            .credentials(creds)
            .authentication(vec![Mechanism::Plain])
            .tls(Tls::Required(tls_parameters))
            .build();

        transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Send(e.to_string()))?;
        Ok(())
    }
}

// --- Dispatcher ---

#[derive(Clone)]
pub struct Notifier {
    smtp: SmtpSettings,
    transport: Arc<dyn MailTransport>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("smtp_host", &self.smtp.host)
            .field("smtp_port", &self.smtp.port)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(smtp: SmtpSettings, transport: Arc<dyn MailTransport>) -> Self {
        Self { smtp, transport }
    }

    pub fn is_configured(&self) -> bool {
        self.smtp.is_complete()
    }

    /// Emails `record` with the ledger attached. Never fails; see [`NotifyOutcome`].
    pub async fn notify(&self, record: &AbsenceRecord, ledger_path: &Path) -> NotifyOutcome {
        let Some(relay) = self.smtp.relay() else {
            warn!("SMTP configuration incomplete. Email will not be sent.");
            return NotifyOutcome::SkippedConfig;
        };

        let email = compose_email(record, ledger_path);
        match self.transport.send(&relay, &email).await {
            Ok(()) => {
                info!("Notification for '{}' sent to {}", record.student_name, relay.recipient);
                NotifyOutcome::Delivered
            }
            Err(e) => {
                error!("Error sending notification email: {}", e);
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }
}
