//! Collaborator ports. The orchestrator only ever sees these traits; the
//! `attendance-gateways` crate supplies the sqlx/reqwest/lettre adapters and
//! tests supply in-memory stand-ins.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::{GenerationOutcome, SessionRow};

/// Error from the session query.
#[derive(Debug, Clone)]
pub struct QueryError(pub String);

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for QueryError {}

/// Error from sending email.
#[derive(Debug, Clone)]
pub struct MailError(pub String);

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MailError {}

/// Error from the audit sink.
#[derive(Debug, Clone)]
pub struct AuditError(pub String);

impl std::fmt::Display for AuditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for AuditError {}

/// Read side of the attendance source.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Every (session, instructor) row scheduled for `target`. Duplicate raw
    /// rows are already eliminated; a failure is the caller's to report.
    async fn fetch_sessions(&self, target: NaiveDate) -> Result<Vec<SessionRow>, QueryError>;
}

/// The external document-generation API.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Requests generation of the filled sheet for one group. Never fails:
    /// transport, timeout and parse problems come back as a failure outcome.
    async fn generate(&self, action_ref: &str, session_ids: &[i64]) -> GenerationOutcome;
}

/// One outbound HTML message, recipients already resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub html: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub reply_to: Vec<String>,
    pub attachments: Vec<PathBuf>,
}

/// Outbound email transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Append-only audit sink.
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    /// Appends one audit row. Best-effort by policy: callers downgrade a
    /// failure to a warning instead of propagating it.
    async fn record_action(
        &self,
        entity_id: &str,
        message: &str,
        category: &str,
        action_ref: &str,
    ) -> Result<(), AuditError>;
}
