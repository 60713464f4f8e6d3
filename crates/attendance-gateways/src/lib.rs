//! Adapter implementations of the `attendance-core` collaborator ports:
//! sqlx/MySQL for the relational source and audit sink, reqwest for the
//! document-generation API, lettre for SMTP.

mod audit_db;
mod db;
mod generation_api;
mod session_db;
mod smtp_mailer;

pub use audit_db::SqlAuditRecorder;
pub use db::mysql_pool;
pub use generation_api::HttpGenerationClient;
pub use session_db::SqlSessionGateway;
pub use smtp_mailer::{SmtpMailer, SmtpSettings};

/// Error constructing an adapter from settings. Fatal at startup: if the
/// collaborators cannot even be built, the run never starts.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct SetupError(pub String);
