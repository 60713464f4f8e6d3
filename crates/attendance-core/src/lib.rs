pub mod compose;
pub mod grouping;
pub mod model;
pub mod orchestrator;
pub mod ports;
pub mod run_log;
pub mod timefmt;

// Minimal user-facing API: the orchestrator plus the types its collaborators
// exchange.
pub use model::{GenerationOutcome, ReportRow, ReportStatus, RunSummary, SessionOutcome, SessionRow};
pub use orchestrator::{Orchestrator, RunOptions};
pub use ports::{AuditRecorder, DocumentGenerator, EmailMessage, Mailer, SessionGateway};

/// Name the routine announces in logs, report footers and alert emails.
pub const ROUTINE_NAME: &str = "attendance-batch";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
