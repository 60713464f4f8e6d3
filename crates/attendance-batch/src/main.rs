//! Single-shot batch entry point.
//!
//! Wires the collaborators from environment settings and runs the pipeline
//! once. Exit code 0 for any completed run: individual group, email or
//! audit failures are partial failures, reported in the run's own report
//! email, not process failures. Exit code 1 only when the process cannot
//! initialize (settings or collaborator construction).

mod observability;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use attendance_core::{Orchestrator, RunOptions};
use attendance_gateways::{
    HttpGenerationClient, SetupError, SmtpMailer, SqlAuditRecorder, SqlSessionGateway, mysql_pool,
};

use settings::Settings;

fn build(settings: &Settings) -> Result<Orchestrator, SetupError> {
    let sessions_pool = mysql_pool(&settings.sessions_db_url)?;
    let audit_pool = mysql_pool(&settings.audit_db_url)?;
    let generator = HttpGenerationClient::new(
        settings.api.url(settings.test_mode),
        settings.api.timeout_secs,
    )?;
    let mailer = SmtpMailer::new(&settings.smtp)?;

    let options = RunOptions {
        test_mode: settings.test_mode,
        test_address: settings.test_address.clone(),
        ops_address: settings.ops_address.clone(),
        pedagogy_address: settings.pedagogy_address.clone(),
        date_override: settings.date_override,
    };
    Ok(Orchestrator::new(
        options,
        Arc::new(SqlSessionGateway::new(
            sessions_pool,
            settings.excluded_instructors.clone(),
        )),
        Arc::new(generator),
        Arc::new(mailer),
        Arc::new(SqlAuditRecorder::new(audit_pool)),
    ))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // .env first so the settings read below sees it.
    dotenvy::dotenv().ok();
    observability::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("fatal: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut orchestrator = match build(&settings) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("fatal: {e}");
            return ExitCode::FAILURE;
        }
    };

    let summary = orchestrator.run().await;
    tracing::info!(
        target_date = %summary.target_date,
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "run completed"
    );
    ExitCode::SUCCESS
}
