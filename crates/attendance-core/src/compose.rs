//! Email and report composition.
//!
//! All outbound HTML is rendered through handlebars templates sharing one
//! page layout; interpolated values are escaped by the default escaper. The
//! texts themselves are Portuguese, matching the institution's fixed
//! templates. [`MailPolicy`] is the single cross-cutting test-mode rule:
//! it applies identically to instructor, alert and report emails.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use handlebars::Handlebars;
use serde_json::json;

use crate::model::{ReportRow, SessionOutcome, SessionRow};
use crate::run_log::{LogLevel, RunLog};
use crate::timefmt::format_hour;
use crate::{ROUTINE_NAME, VERSION};

const LAYOUT: &str = "\
<!DOCTYPE html><html>\n\
<head><meta charset='utf-8'>\n\
<style>\n\
  body  { font-family: Arial, sans-serif; font-size: 13px; color: #333; margin: 0; padding: 0; }\n\
  .content { padding: 20px 24px; }\n\
  table { border-collapse: collapse; width: 100%; }\n\
  table th { background: #ed7520; color: #fff; padding: 7px 12px; text-align: left; border: 1px solid #d4641a; }\n\
  table td { padding: 6px 12px; border: 1px solid #eee; }\n\
  .footer { font-size: 11px; color: #999; padding: 10px 24px 16px; border-top: 2px solid #ed7520; margin-top: 20px; }\n\
</style></head>\n\
<body>\n\
  <div class='content'>{{{content}}}</div>\n\
{{#if footer}}\
  <div class='footer'>Instituto CRIAP &mdash; envio autom&aacute;tico<br><small>{{version}}</small></div>\n\
{{/if}}\
</body></html>\n";

const INSTRUCTOR_EMAIL: &str = "\
<p>Estimado(a) Professor(a) <b>{{instructor}}</b>,</p>\n\
<p>Fazemos votos de que se encontre bem.</p>\n\
<p>No seguimento da aula prevista para o dia <b>{{date}}</b>, a decorrer no hor&aacute;rio das \
<b>{{start}}</b> &agrave;s <b>{{end}}</b>, procedemos ao envio, em anexo, da folha de \
presen&ccedil;as preenchida.</p>\n\
<p>Caso necessite de qualquer esclarecimento adicional, n&atilde;o hesite em contactar-nos.</p>\n\
<p>Com os melhores cumprimentos,<br><b>Departamento T&eacute;cnico-Pedag&oacute;gico</b><br>Instituto CRIAP</p>\n";

const ALERT_EMAIL: &str = "\
<p style='color:#c0392b;'><b>Ocorreu um erro na rotina <u>{{routine}}</u>.</b></p>\n\
<pre style='background:#ffe4d6;border:1px solid #ed7520;padding:12px;font-size:11px;\
white-space:pre-wrap;word-break:break-all;'>{{detail}}</pre>\n";

const RUN_REPORT: &str = "\
<p><b>Data alvo:</b> {{target_date}} &nbsp;&nbsp; <b>Modo Teste:</b> {{test_mode}}</p>\n\
<p style='margin:8px 0;'>\n\
  <b>Total:</b> {{total}}\n\
  &nbsp;|&nbsp;<b style='color:#27ae60;'>Sucesso:</b> {{succeeded}}\n\
  &nbsp;|&nbsp;<b style='color:#c0392b;'>Erros:</b> {{failed}}\n\
</p>\n\
{{#if rows}}\
<table border='0' cellpadding='5' cellspacing='0' style='border-collapse:collapse;font-size:12px;width:100%;'>\n\
  <tr style='background:#ed7520;color:#fff;'>\n\
    <th>Ref A&ccedil;&atilde;o</th><th>Curso</th><th>Formador</th><th>Email</th>\
<th>Sess&atilde;o N&ordm;</th><th>Data/Hora</th><th>Status</th><th>Mensagem</th>\n\
  </tr>\n\
{{#each rows}}\
  <tr style='background:{{bg}};'>\n\
    <td>{{action_ref}}</td><td>{{course}}</td><td>{{instructor}}</td><td>{{email}}</td>\n\
    <td style='text-align:center;'>{{session}}</td><td>{{window}}</td>\n\
    <td style='color:{{color}};font-weight:bold;text-align:center;'>{{status}}</td><td>{{message}}</td>\n\
  </tr>\n\
{{/each}}\
</table>\n\
{{else}}\
<p style='color:#888;'>Nenhum item processado.</p>\n\
{{/if}}\
<hr style='margin:24px 0;border:none;border-top:1px solid #ddd;'>\n\
<h3 style='font-size:13px;color:#555;'>Log de Execu&ccedil;&atilde;o</h3>\n\
{{#if log}}\
<table border='0' cellpadding='4' cellspacing='0' style='border-collapse:collapse;font-size:12px;width:100%;'>\n\
  <tr style='background:#ed7520;color:#fff;'><th>Hora</th><th>N&iacute;vel</th><th>Mensagem</th></tr>\n\
{{#each log}}\
  <tr style='background:{{bg}};'><td style='white-space:nowrap;'>{{at}}</td>\
<td style='color:{{color}};font-weight:bold;white-space:nowrap;'>{{level}}</td><td>{{message}}</td></tr>\n\
{{/each}}\
</table>\n\
{{else}}\
<p>Nenhum log registado.</p>\n\
{{/if}}";

/// A rendered message, before recipient resolution.
#[derive(Debug, Clone)]
pub struct ComposedEmail {
    pub subject: String,
    pub html: String,
    pub attachments: Vec<PathBuf>,
}

/// The run-wide test-mode redirect rule.
///
/// In test mode every non-empty recipient class (to/cc/reply-to) collapses to
/// the single test address and every subject gains a fixed prefix; outside
/// test mode addresses pass through untouched.
#[derive(Debug, Clone)]
pub struct MailPolicy {
    pub test_mode: bool,
    pub test_address: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipients {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub reply_to: Vec<String>,
}

impl MailPolicy {
    pub fn resolve(&self, to: Vec<String>, cc: Vec<String>, reply_to: Vec<String>) -> Recipients {
        if !self.test_mode {
            return Recipients { to, cc, reply_to };
        }
        let redirect = |list: Vec<String>| {
            if list.is_empty() {
                list
            } else {
                vec![self.test_address.clone()]
            }
        };
        Recipients {
            to: redirect(to),
            cc: redirect(cc),
            reply_to: redirect(reply_to),
        }
    }

    pub fn subject(&self, subject: String) -> String {
        if self.test_mode {
            format!("[TESTE] {subject}")
        } else {
            subject
        }
    }
}

/// The session's formatted schedule pieces, shared between the instructor
/// email and its report row.
pub(crate) struct Schedule {
    pub date_slash: String,
    pub date_dot: String,
    pub start: String,
    pub end: String,
}

impl Schedule {
    pub(crate) fn window(&self) -> String {
        format!("{} {}-{}", self.date_slash, self.start, self.end)
    }
}

pub(crate) fn schedule_of(row: &SessionRow, result: &SessionOutcome) -> Schedule {
    let date_slash = row
        .date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .or_else(|| result.session_date.clone())
        .unwrap_or_else(|| Local::now().format("%d/%m/%Y").to_string());
    Schedule {
        date_dot: date_slash.replace('/', "."),
        date_slash,
        start: format_hour(row.start_time.as_deref().unwrap_or("")),
        end: format_hour(row.end_time.as_deref().unwrap_or("")),
    }
}

/// Formatted `dd/MM/yyyy HHhMM-HHhMM` window for a report row.
pub fn session_window(row: &SessionRow, result: &SessionOutcome) -> String {
    schedule_of(row, result).window()
}

pub struct Composer {
    hbs: Handlebars<'static>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        let mut hbs = Handlebars::new();
        // Static templates; a registration failure is a programming error.
        hbs.register_template_string("layout", LAYOUT)
            .expect("layout template");
        hbs.register_template_string("instructor_email", INSTRUCTOR_EMAIL)
            .expect("instructor template");
        hbs.register_template_string("alert_email", ALERT_EMAIL)
            .expect("alert template");
        hbs.register_template_string("run_report", RUN_REPORT)
            .expect("report template");
        Self { hbs }
    }

    /// The bilingual-safe instructor message: fixed body, `HHhMM` times, the
    /// generated document attached only when the API produced a real path.
    pub fn instructor_email(&self, row: &SessionRow, result: &SessionOutcome) -> ComposedEmail {
        let schedule = schedule_of(row, result);
        let subject = format!(
            "Instituto CRIAP || Folha Sumário Presença - {} - {}",
            row.course.as_deref().unwrap_or_default(),
            schedule.date_slash
        );
        let content = self.render(
            "instructor_email",
            &json!({
                "instructor": row.instructor_name,
                "date": schedule.date_dot,
                "start": schedule.start,
                "end": schedule.end,
            }),
        );
        ComposedEmail {
            subject,
            html: self.layout(&content, false),
            attachments: result
                .pdf_attachment()
                .map(|p| vec![PathBuf::from(p)])
                .unwrap_or_default(),
        }
    }

    /// Side-channel alert for one ERROR-level event.
    pub fn alert_email(&self, detail: &str) -> ComposedEmail {
        let content = self.render(
            "alert_email",
            &json!({ "routine": ROUTINE_NAME, "detail": detail }),
        );
        ComposedEmail {
            subject: format!(
                "ERRO - {} [{}]",
                ROUTINE_NAME,
                Local::now().format("%d/%m/%Y %H:%M")
            ),
            html: self.layout(&content, true),
            attachments: Vec::new(),
        }
    }

    /// The end-of-run report: count block, row-per-outcome table and the full
    /// run-log transcript.
    pub fn run_report(
        &self,
        target: NaiveDate,
        test_mode: bool,
        rows: &[ReportRow],
        log: &RunLog,
    ) -> ComposedEmail {
        let date_fmt = target.format("%d/%m/%Y").to_string();
        let succeeded = rows.iter().filter(|r| r.status.is_ok()).count();

        let row_data: Vec<serde_json::Value> = rows
            .iter()
            .map(|r| {
                let ok = r.status.is_ok();
                json!({
                    "bg": if ok { "#eafaf1" } else { "#ffe4d6" },
                    "color": if ok { "#27ae60" } else { "#c0392b" },
                    "action_ref": r.action_ref,
                    "course": r.course,
                    "instructor": r.instructor_name,
                    "email": r.instructor_email,
                    "session": r.session_number,
                    "window": r.window,
                    "status": r.status.label(),
                    "message": r.message,
                })
            })
            .collect();

        let log_data: Vec<serde_json::Value> = log
            .entries()
            .iter()
            .map(|e| {
                let (bg, color) = match e.level {
                    LogLevel::Error => ("#ffe4d6", "#c0392b"),
                    LogLevel::Warn => ("#fff9e6", "#d68910"),
                    LogLevel::Ok => ("#eafaf1", "#27ae60"),
                    LogLevel::Info => ("#fff", "#333"),
                };
                json!({
                    "bg": bg,
                    "color": color,
                    "at": e.at.format("%H:%M:%S").to_string(),
                    "level": e.level.label(),
                    "message": e.message,
                })
            })
            .collect();

        let content = self.render(
            "run_report",
            &json!({
                "target_date": date_fmt,
                "test_mode": test_mode,
                "total": rows.len(),
                "succeeded": succeeded,
                "failed": rows.len() - succeeded,
                "rows": row_data,
                "log": log_data,
            }),
        );
        ComposedEmail {
            subject: format!(
                "Instituto CRIAP || Relatório Folha Sumário Presença F029 - Sessões {date_fmt}"
            ),
            html: self.layout(&content, true),
            attachments: Vec::new(),
        }
    }

    fn layout(&self, content: &str, footer: bool) -> String {
        self.render(
            "layout",
            &json!({
                "content": content,
                "footer": footer,
                "version": format!("v{VERSION} | {ROUTINE_NAME}"),
            }),
        )
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> String {
        self.hbs.render(name, data).unwrap_or_else(|e| {
            tracing::error!(template = name, error = %e, "template render failed");
            String::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReportStatus;

    fn sample_row() -> SessionRow {
        SessionRow {
            session_id: 7,
            date: NaiveDate::from_ymd_opt(2026, 1, 10),
            start_time: Some("19:00:00".into()),
            end_time: Some("22:30:00".into()),
            module_id: None,
            session_number: Some("3".into()),
            instructor_name: Some("J. Silva".into()),
            course: Some("Psicologia Clínica".into()),
            action_number: 12,
            action_ref: Some("PC-12".into()),
            instructor_code: 321,
            email: Some("jsilva@example.com".into()),
        }
    }

    fn sample_result(pdf: Option<&str>) -> SessionOutcome {
        SessionOutcome {
            session_id: 7,
            session_number: Some("3".into()),
            session_date: Some("10/01/2026".into()),
            pdf_path: pdf.map(String::from),
            success: true,
            ..SessionOutcome::default()
        }
    }

    #[test]
    fn test_mode_collapses_every_recipient_class() {
        let policy = MailPolicy {
            test_mode: true,
            test_address: "teste@example.com".into(),
        };
        let recipients = policy.resolve(
            vec!["a@example.com".into()],
            vec!["b@example.com".into(), "c@example.com".into()],
            vec!["d@example.com".into()],
        );
        assert_eq!(recipients.to, vec!["teste@example.com"]);
        assert_eq!(recipients.cc, vec!["teste@example.com"]);
        assert_eq!(recipients.reply_to, vec!["teste@example.com"]);
        assert_eq!(policy.subject("Olá".into()), "[TESTE] Olá");
    }

    #[test]
    fn real_mode_passes_recipients_through() {
        let policy = MailPolicy {
            test_mode: false,
            test_address: "teste@example.com".into(),
        };
        let recipients = policy.resolve(vec!["a@example.com".into()], Vec::new(), Vec::new());
        assert_eq!(recipients.to, vec!["a@example.com"]);
        assert!(recipients.cc.is_empty());
        assert_eq!(policy.subject("Olá".into()), "Olá");
    }

    #[test]
    fn instructor_email_formats_schedule_and_attaches_pdf() {
        let composer = Composer::new();
        let email = composer.instructor_email(&sample_row(), &sample_result(Some("/srv/7.pdf")));
        assert!(email.subject.contains("Psicologia Clínica"));
        assert!(email.subject.contains("10/01/2026"));
        assert!(email.html.contains("10.01.2026"));
        assert!(email.html.contains("19h00"));
        assert!(email.html.contains("22h30"));
        assert_eq!(email.attachments, vec![PathBuf::from("/srv/7.pdf")]);
    }

    #[test]
    fn blank_document_path_means_no_attachment() {
        let composer = Composer::new();
        let email = composer.instructor_email(&sample_row(), &sample_result(Some("  ")));
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn session_window_combines_date_and_times() {
        assert_eq!(
            session_window(&sample_row(), &sample_result(None)),
            "10/01/2026 19h00-22h30"
        );
    }

    #[test]
    fn run_report_shows_counts_rows_and_log() {
        let composer = Composer::new();
        let rows = vec![
            ReportRow {
                action_ref: Some("PC-12".into()),
                instructor_name: Some("J. Silva".into()),
                ..ReportRow::new(ReportStatus::Ok, "Email enviado com sucesso")
            },
            ReportRow::new(ReportStatus::ApiError, "HTTP 502: bad gateway"),
        ];
        let mut log = RunLog::new();
        log.info("started");
        log.error("API falhou");

        let target = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let email = composer.run_report(target, false, &rows, &log);
        assert!(email.subject.contains("10/01/2026"));
        assert!(email.html.contains("<b>Total:</b> 2"));
        assert!(email.html.contains("Sucesso:</b> 1"));
        assert!(email.html.contains("Erros:</b> 1"));
        assert!(email.html.contains("ERRO_API"));
        assert!(email.html.contains("API falhou"));
        assert!(email.html.contains(&format!("v{VERSION}")));
    }

    #[test]
    fn empty_report_still_renders_placeholder_and_footer() {
        let composer = Composer::new();
        let target = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let email = composer.run_report(target, true, &[], &RunLog::new());
        assert!(email.html.contains("<b>Total:</b> 0"));
        assert!(email.html.contains("Nenhum item processado"));
        assert!(email.html.contains("Nenhum log registado"));
        assert!(email.html.contains("Modo Teste:</b> true"));
    }

    #[test]
    fn alert_email_escapes_the_detail_block() {
        let composer = Composer::new();
        let email = composer.alert_email("falhou <script>alert(1)</script>");
        assert!(email.subject.starts_with("ERRO - "));
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(!email.html.contains("<script>alert"));
    }
}
