//! lettre-backed implementation of the mailer port.

use std::str::FromStr;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use attendance_core::ports::{EmailMessage, MailError, Mailer};

use crate::SetupError;

/// SMTP connection settings, resolved by the binary before the run starts.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Sender address; doubles as the username when a password is set.
    pub sender: String,
    pub sender_name: Option<String>,
    pub password: Option<String>,
    /// `true` uses the TLS relay builder, `false` plain SMTP.
    pub secure: bool,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpSettings) -> Result<Self, SetupError> {
        let from_address = Address::from_str(&cfg.sender)
            .map_err(|e| SetupError(format!("invalid sender email: {e}")))?;
        let from = Mailbox::new(cfg.sender_name.clone(), from_address);

        let mut builder = if cfg.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
                .map_err(|e| SetupError(format!("smtp relay: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host)
        };
        builder = builder.port(cfg.port);
        if let Some(password) = &cfg.password {
            builder = builder.credentials(Credentials::new(cfg.sender.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn mailbox(raw: &str) -> Result<Mailbox, MailError> {
    Address::from_str(raw.trim())
        .map(|address| Mailbox::new(None, address))
        .map_err(|e| MailError(format!("invalid recipient '{raw}': {e}")))
}

fn attachment_part(path: &std::path::Path) -> Option<SinglePart> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable attachment");
            return None;
        }
    };
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("documento")
        .to_string();
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    let content_type = if is_pdf {
        ContentType::parse("application/pdf")
    } else {
        ContentType::parse("application/octet-stream")
    };
    match content_type {
        Ok(content_type) => Some(Attachment::new(filename).body(bytes, content_type)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping attachment with bad content type");
            None
        }
    }
}

/// Builds the lettre message: HTML body, wrapped in a mixed multipart when
/// attachments are present. Paths that no longer exist are skipped, matching
/// the generation API's habit of returning paths on a share that may have
/// been cleaned up since.
fn build_message(from: &Mailbox, message: &EmailMessage) -> Result<Message, MailError> {
    if message.to.is_empty() {
        return Err(MailError("message has no recipients".into()));
    }
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(message.subject.as_str());
    for to in &message.to {
        builder = builder.to(mailbox(to)?);
    }
    for cc in &message.cc {
        builder = builder.cc(mailbox(cc)?);
    }
    for reply_to in &message.reply_to {
        builder = builder.reply_to(mailbox(reply_to)?);
    }

    let html = SinglePart::builder()
        .header(ContentType::TEXT_HTML)
        .body(message.html.clone());

    let parts: Vec<SinglePart> = message
        .attachments
        .iter()
        .filter_map(|path| attachment_part(path))
        .collect();

    let built = if parts.is_empty() {
        builder.singlepart(html)
    } else {
        let mut multipart = MultiPart::mixed().singlepart(html);
        for part in parts {
            multipart = multipart.singlepart(part);
        }
        builder.multipart(multipart)
    };
    built.map_err(|e| MailError(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let email = build_message(&self.from, message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| MailError(e.to_string()))?;
        Ok(())
    }
}
