//! Row and wire types exchanged between the orchestrator and its
//! collaborators.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row returned by the session query: a scheduled in-person session
/// paired with one of its instructors. The same `session_id` repeats when a
/// session has more than one instructor; rows are never unique per session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub session_id: i64,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub module_id: Option<i64>,
    pub session_number: Option<String>,
    pub instructor_name: Option<String>,
    pub course: Option<String>,
    pub action_number: i64,
    pub action_ref: Option<String>,
    pub instructor_code: i64,
    pub email: Option<String>,
}

/// Request body for the document-generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    #[serde(rename = "refAcao")]
    pub action_ref: String,
    #[serde(rename = "rowIdsSessoes")]
    pub session_ids: Vec<i64>,
}

/// Whole-group verdict from the generation API.
///
/// The producer matches field names case-insensitively, so every field
/// carries aliases for the PascalCase and lowercase spellings next to the
/// canonical camelCase one. Missing fields default; in particular a body
/// without `sucesso` deserializes as a failure. Transport, timeout and parse
/// problems are folded into the same shape via [`GenerationOutcome::failure`]
/// so the caller never sees an error type from this contract.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationOutcome {
    #[serde(rename = "ambiente", alias = "Ambiente")]
    pub environment: Option<String>,
    #[serde(rename = "sucesso", alias = "Sucesso")]
    pub success: bool,
    #[serde(rename = "mensagem", alias = "Mensagem")]
    pub message: Option<String>,
    #[serde(rename = "totalProcessado", alias = "TotalProcessado", alias = "totalprocessado")]
    pub total_processed: i64,
    #[serde(rename = "totalSucesso", alias = "TotalSucesso", alias = "totalsucesso")]
    pub total_succeeded: i64,
    #[serde(rename = "totalFalhas", alias = "TotalFalhas", alias = "totalfalhas")]
    pub total_failed: i64,
    #[serde(rename = "sessoes", alias = "Sessoes")]
    pub sessions: Vec<SessionOutcome>,
}

impl GenerationOutcome {
    /// Uniform failure shape for "the API gave us nothing usable".
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Per-session verdict inside a [`GenerationOutcome`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionOutcome {
    #[serde(rename = "rowIdSessao", alias = "RowIdSessao", alias = "rowidsessao")]
    pub session_id: i64,
    #[serde(rename = "numeroSessao", alias = "NumeroSessao", alias = "numerosessao")]
    pub session_number: Option<String>,
    #[serde(rename = "dataSessao", alias = "DataSessao", alias = "datasessao")]
    pub session_date: Option<String>,
    #[serde(rename = "pathDocx", alias = "PathDocx", alias = "pathdocx")]
    pub docx_path: Option<String>,
    #[serde(rename = "pathPdf", alias = "PathPdf", alias = "pathpdf")]
    pub pdf_path: Option<String>,
    #[serde(rename = "sucesso", alias = "Sucesso")]
    pub success: bool,
    #[serde(rename = "mensagemErro", alias = "MensagemErro", alias = "mensagemerro")]
    pub error: Option<String>,
}

impl SessionOutcome {
    /// The attachable document path, if the API actually produced one. A
    /// successful session with a blank path yields `None`: generated on
    /// paper, nothing to attach.
    pub fn pdf_attachment(&self) -> Option<&str> {
        self.pdf_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Where in the pipeline an outcome row was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Ok,
    /// The session query itself failed; distinguishable from an empty day.
    QueryFailed,
    /// The group-level API call failed; one row covers the whole group.
    ApiError,
    /// The API answered but marked this session failed.
    GenerationError,
    /// Document generated, email to the instructor failed.
    EmailError,
}

impl ReportStatus {
    /// Label shown in the (Portuguese) report table.
    pub fn label(self) -> &'static str {
        match self {
            ReportStatus::Ok => "OK",
            ReportStatus::QueryFailed => "ERRO_CONSULTA",
            ReportStatus::ApiError => "ERRO_API",
            ReportStatus::GenerationError => "ERRO_GERACAO",
            ReportStatus::EmailError => "ERRO_EMAIL",
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, ReportStatus::Ok)
    }
}

/// One line of the end-of-run outcome table. Granularity varies: group,
/// session or instructor, depending on where the outcome was decided.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub action_ref: Option<String>,
    pub course: Option<String>,
    pub instructor_name: Option<String>,
    pub instructor_email: Option<String>,
    pub session_number: Option<String>,
    pub window: Option<String>,
    pub status: ReportStatus,
    pub message: String,
}

impl ReportRow {
    pub fn new(status: ReportStatus, message: impl Into<String>) -> Self {
        Self {
            action_ref: None,
            course: None,
            instructor_name: None,
            instructor_email: None,
            session_number: None,
            window: None,
            status,
            message: message.into(),
        }
    }
}

/// Run-level totals handed back to the process boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub target_date: NaiveDate,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_parses_camel_case_body() {
        let body = r#"{
            "ambiente": "prod",
            "sucesso": true,
            "mensagem": null,
            "totalProcessado": 2,
            "totalSucesso": 1,
            "totalFalhas": 1,
            "sessoes": [
                {"rowIdSessao": 7, "numeroSessao": "3", "dataSessao": "10/01/2026",
                 "pathPdf": "/srv/f029/7.pdf", "sucesso": true},
                {"rowIdSessao": 8, "sucesso": false, "mensagemErro": "sem presenças"}
            ]
        }"#;
        let outcome: GenerationOutcome = serde_json::from_str(body).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.total_processed, 2);
        assert_eq!(outcome.sessions.len(), 2);
        assert_eq!(outcome.sessions[0].pdf_attachment(), Some("/srv/f029/7.pdf"));
        assert_eq!(outcome.sessions[1].error.as_deref(), Some("sem presenças"));
    }

    #[test]
    fn outcome_parses_pascal_case_body() {
        let body = r#"{
            "Sucesso": true,
            "TotalSucesso": 1,
            "Sessoes": [{"RowIdSessao": 5, "PathPdf": "a.pdf", "Sucesso": true}]
        }"#;
        let outcome: GenerationOutcome = serde_json::from_str(body).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.sessions[0].session_id, 5);
        assert!(outcome.sessions[0].success);
    }

    #[test]
    fn outcome_defaults_missing_fields_to_failure() {
        let outcome: GenerationOutcome = serde_json::from_str("{}").unwrap();
        assert!(!outcome.success);
        assert!(outcome.sessions.is_empty());
        assert_eq!(outcome.total_processed, 0);
    }

    #[test]
    fn failure_constructor_carries_the_message() {
        let outcome = GenerationOutcome::failure("HTTP 502: bad gateway");
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("HTTP 502: bad gateway"));
        assert!(outcome.sessions.is_empty());
    }

    #[test]
    fn blank_pdf_path_is_not_attachable() {
        let session = SessionOutcome {
            success: true,
            pdf_path: Some("   ".into()),
            ..SessionOutcome::default()
        };
        assert_eq!(session.pdf_attachment(), None);
    }

    #[test]
    fn request_serializes_wire_field_names() {
        let request = GenerationRequest {
            action_ref: "REF-1".into(),
            session_ids: vec![1, 2],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["refAcao"], "REF-1");
        assert_eq!(json["rowIdsSessoes"], serde_json::json!([1, 2]));
    }
}
