//! The run pipeline: resolve date, query, group, call the generation API,
//! reconcile per-session results back to instructors, notify, audit,
//! report.
//!
//! Owns all control flow and the run-level outcome. Nothing a collaborator
//! returns can abort the run: every failure is folded into the report and
//! the run log, and the final report email is sent under every branch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::compose::{ComposedEmail, Composer, MailPolicy, Recipients, session_window};
use crate::grouping::{group_sessions, index_by_session};
use crate::model::{ReportRow, ReportStatus, RunSummary, SessionOutcome, SessionRow};
use crate::ports::{AuditRecorder, DocumentGenerator, EmailMessage, Mailer, SessionGateway};
use crate::run_log::RunLog;
use crate::{ROUTINE_NAME, VERSION};

/// Category written with every audit row.
pub const AUDIT_CATEGORY: &str = "Folha Sumário Presença - F029";

/// Run-level knobs, resolved by the caller and injected at construction.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub test_mode: bool,
    pub test_address: String,
    /// Operations inbox: receives error alerts and the final report.
    pub ops_address: String,
    /// Pedagogical department inbox: CC'd on instructor emails, receives the
    /// final report.
    pub pedagogy_address: String,
    /// Fixed target date for rehearsals; `None` means yesterday.
    pub date_override: Option<NaiveDate>,
}

pub struct Orchestrator {
    options: RunOptions,
    policy: MailPolicy,
    composer: Composer,
    sessions: Arc<dyn SessionGateway>,
    generator: Arc<dyn DocumentGenerator>,
    mailer: Arc<dyn Mailer>,
    audit: Arc<dyn AuditRecorder>,
    log: RunLog,
    report: Vec<ReportRow>,
}

impl Orchestrator {
    pub fn new(
        options: RunOptions,
        sessions: Arc<dyn SessionGateway>,
        generator: Arc<dyn DocumentGenerator>,
        mailer: Arc<dyn Mailer>,
        audit: Arc<dyn AuditRecorder>,
    ) -> Self {
        let policy = MailPolicy {
            test_mode: options.test_mode,
            test_address: options.test_address.clone(),
        };
        Self {
            options,
            policy,
            composer: Composer::new(),
            sessions,
            generator,
            mailer,
            audit,
            log: RunLog::new(),
            report: Vec::new(),
        }
    }

    /// Executes one full run. Infallible by contract: collaborator failures
    /// degrade the run, they never escape it.
    pub async fn run(&mut self) -> RunSummary {
        self.log.info(format!("=== {ROUTINE_NAME} v{VERSION} started ==="));
        self.log.info(format!(
            "test mode: {} | date override: {}",
            self.options.test_mode,
            self.options
                .date_override
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
        ));

        let target = self.target_date(Local::now().date_naive());
        self.log
            .info(format!("target date: {}", target.format("%d/%m/%Y")));

        let rows = self.query_sessions(target).await;
        if rows.is_empty() {
            if self.report.is_empty() {
                self.log.warn(format!(
                    "no in-person sessions found for {}",
                    target.format("%d/%m/%Y")
                ));
            }
            self.send_final_report(target).await;
            return self.summary(target);
        }
        self.log.info(format!("{} row(s) found", rows.len()));

        let by_session = index_by_session(&rows);
        for (action_ref, session_ids) in group_sessions(&rows) {
            self.process_group(&action_ref, &session_ids, &by_session)
                .await;
        }

        self.send_final_report(target).await;
        self.log.info(format!("=== {ROUTINE_NAME} finished ==="));
        self.summary(target)
    }

    /// Override date wins; otherwise the day before the run date, because the
    /// routine runs once daily for the prior day's sessions.
    fn target_date(&mut self, today: NaiveDate) -> NaiveDate {
        if let Some(date) = self.options.date_override {
            self.log.warn(format!(
                "date override active: using {} instead of yesterday",
                date.format("%d/%m/%Y")
            ));
            return date;
        }
        today.pred_opt().unwrap_or(today)
    }

    /// A failed query degrades to an empty day, but leaves its own report row
    /// so the run report can tell "query broke" from "nothing scheduled".
    async fn query_sessions(&mut self, target: NaiveDate) -> Vec<SessionRow> {
        self.log.info("querying scheduled sessions...");
        match self.sessions.fetch_sessions(target).await {
            Ok(rows) => rows,
            Err(err) => {
                self.record_error(format!("session query failed: {err}")).await;
                self.report.push(ReportRow::new(
                    ReportStatus::QueryFailed,
                    format!("Falha na consulta de sessões: {err}"),
                ));
                Vec::new()
            }
        }
    }

    async fn process_group(
        &mut self,
        action_ref: &str,
        session_ids: &[i64],
        by_session: &HashMap<i64, Vec<&SessionRow>>,
    ) {
        self.log.info(format!(
            "processing action '{}' with {} session(s)...",
            action_ref,
            session_ids.len()
        ));

        let outcome = self.generator.generate(action_ref, session_ids).await;
        if !outcome.success {
            let message = outcome
                .message
                .unwrap_or_else(|| "Sem resposta / timeout da API".to_string());
            self.record_error(format!("generation API failed for '{action_ref}': {message}"))
                .await;
            self.report.push(ReportRow {
                action_ref: Some(action_ref.to_string()),
                ..ReportRow::new(ReportStatus::ApiError, message)
            });
            return;
        }
        self.log.ok(format!(
            "API ok: {} generated, {} failed",
            outcome.total_succeeded, outcome.total_failed
        ));

        for failed in outcome.sessions.iter().filter(|s| !s.success) {
            let message = failed
                .error
                .clone()
                .unwrap_or_else(|| "Falha ao gerar a folha de presenças".to_string());
            self.record_error(format!(
                "generation failed for session {}: {}",
                failed.session_number.as_deref().unwrap_or("?"),
                message
            ))
            .await;
            self.report.push(ReportRow {
                action_ref: Some(action_ref.to_string()),
                session_number: failed.session_number.clone(),
                window: failed.session_date.clone(),
                ..ReportRow::new(ReportStatus::GenerationError, message)
            });
        }

        for generated in outcome.sessions.iter().filter(|s| s.success) {
            let Some(instructors) = by_session.get(&generated.session_id) else {
                self.log.warn(format!(
                    "API returned session {} that matches no queried row",
                    generated.session_id
                ));
                continue;
            };
            for row in instructors.iter().copied() {
                self.notify_instructor(action_ref, row, generated).await;
            }
        }
    }

    /// One email, one report row and (on success) one audit row per
    /// instructor of a generated session.
    async fn notify_instructor(
        &mut self,
        action_ref: &str,
        row: &SessionRow,
        generated: &SessionOutcome,
    ) {
        let email = self.composer.instructor_email(row, generated);
        let missing_document = email.attachments.is_empty();
        if missing_document {
            self.log.warn(format!(
                "session {} reported generated but carries no document path; sending without attachment",
                generated.session_id
            ));
        }

        let recipients = self.policy.resolve(
            row.email.clone().into_iter().collect(),
            vec![
                self.options.pedagogy_address.clone(),
                self.options.ops_address.clone(),
            ],
            vec![self.options.pedagogy_address.clone()],
        );
        let message = self.envelope(email, recipients);

        let base = ReportRow {
            action_ref: row
                .action_ref
                .clone()
                .or_else(|| Some(action_ref.to_string())),
            course: row.course.clone(),
            instructor_name: row.instructor_name.clone(),
            instructor_email: row.email.clone(),
            session_number: generated.session_number.clone(),
            window: Some(session_window(row, generated)),
            ..ReportRow::new(ReportStatus::Ok, "")
        };

        match self.mailer.send(&message).await {
            Ok(()) => {
                self.log.ok(format!(
                    "email sent to {} ({}) | session {}",
                    row.instructor_name.as_deref().unwrap_or("?"),
                    row.email.as_deref().unwrap_or("?"),
                    generated.session_number.as_deref().unwrap_or("?")
                ));
                let note = if missing_document {
                    "Email enviado sem anexo (documento em falta)"
                } else {
                    "Email enviado com sucesso"
                };
                self.report.push(ReportRow {
                    message: note.to_string(),
                    ..base
                });
                self.audit_success(action_ref, row, generated).await;
            }
            Err(err) => {
                self.record_error(format!(
                    "email to {} failed: {}",
                    row.email.as_deref().unwrap_or("?"),
                    err
                ))
                .await;
                self.report.push(ReportRow {
                    status: ReportStatus::EmailError,
                    message: err.0,
                    ..base
                });
            }
        }
    }

    /// Best-effort: an audit failure is strictly less important than the
    /// notification itself and degrades to a warning.
    async fn audit_success(&mut self, action_ref: &str, row: &SessionRow, generated: &SessionOutcome) {
        let message = format!(
            "F029 gerado e email enviado | Sessão {} | {} | PDF: {}",
            generated.session_number.as_deref().unwrap_or(""),
            generated.session_date.as_deref().unwrap_or(""),
            generated.pdf_path.as_deref().unwrap_or("")
        );
        if let Err(err) = self
            .audit
            .record_action(
                &row.instructor_code.to_string(),
                &message,
                AUDIT_CATEGORY,
                action_ref,
            )
            .await
        {
            self.log.warn(format!(
                "audit write failed for instructor {}: {}",
                row.instructor_code, err
            ));
        }
    }

    /// Logs at ERROR level and sends the side-channel alert. The alert send
    /// itself can only degrade to a warning.
    async fn record_error(&mut self, detail: String) {
        self.log.error(detail.clone());
        let alert = self.composer.alert_email(&detail);
        let recipients =
            self.policy
                .resolve(vec![self.options.ops_address.clone()], Vec::new(), Vec::new());
        let message = self.envelope(alert, recipients);
        if let Err(err) = self.mailer.send(&message).await {
            self.log.warn(format!("error alert email failed: {err}"));
        }
    }

    /// Sent under every branch; a failure here is logged and alerted, never
    /// raised.
    async fn send_final_report(&mut self, target: NaiveDate) {
        self.log.info("composing final run report...");
        let report =
            self.composer
                .run_report(target, self.options.test_mode, &self.report, &self.log);
        let recipients = self.policy.resolve(
            vec![
                self.options.ops_address.clone(),
                self.options.pedagogy_address.clone(),
            ],
            Vec::new(),
            Vec::new(),
        );
        let message = self.envelope(report, recipients);
        match self.mailer.send(&message).await {
            Ok(()) => self.log.ok("final report email sent"),
            Err(err) => {
                self.record_error(format!("final report email failed: {err}"))
                    .await
            }
        }
    }

    fn envelope(&self, email: ComposedEmail, recipients: Recipients) -> EmailMessage {
        EmailMessage {
            subject: self.policy.subject(email.subject),
            html: email.html,
            to: recipients.to,
            cc: recipients.cc,
            reply_to: recipients.reply_to,
            attachments: email.attachments,
        }
    }

    fn summary(&self, target: NaiveDate) -> RunSummary {
        let succeeded = self.report.iter().filter(|r| r.status.is_ok()).count();
        RunSummary {
            target_date: target,
            total: self.report.len(),
            succeeded,
            failed: self.report.len() - succeeded,
        }
    }
}
