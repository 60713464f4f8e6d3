//! reqwest-backed implementation of the document-generation port.
//!
//! The contract with the orchestrator is outcome-not-exception: every
//! transport, timeout and parse problem comes back as a failure
//! [`GenerationOutcome`], never as an error.

use std::time::Duration;

use async_trait::async_trait;

use attendance_core::model::{GenerationOutcome, GenerationRequest};
use attendance_core::ports::DocumentGenerator;

use crate::SetupError;

/// Endpoint path, relative to the configured base URL.
const ENDPOINT: &str = "/api/v2/acoes-dtp/gerar-f029-preenchido";

pub struct HttpGenerationClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpGenerationClient {
    /// One client per run; base URL and timeout are fixed at construction.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, SetupError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SetupError(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    fn timeout_outcome(&self) -> GenerationOutcome {
        GenerationOutcome::failure(format!(
            "Timeout ao chamar a API (>{}s)",
            self.timeout_secs
        ))
    }
}

/// Maps an HTTP status and body to the uniform outcome shape. 2xx bodies are
/// parsed (case-insensitive field matching lives in the wire types); anything
/// else is a failure outcome carrying the status code and the raw body.
fn outcome_from_response(status: u16, body: &str) -> GenerationOutcome {
    if (200..300).contains(&status) {
        match serde_json::from_str::<GenerationOutcome>(body) {
            Ok(outcome) => outcome,
            Err(e) => GenerationOutcome::failure(format!("Resposta inválida da API: {e}")),
        }
    } else {
        GenerationOutcome::failure(format!("HTTP {status}: {body}"))
    }
}

#[async_trait]
impl DocumentGenerator for HttpGenerationClient {
    async fn generate(&self, action_ref: &str, session_ids: &[i64]) -> GenerationOutcome {
        let request = GenerationRequest {
            action_ref: action_ref.to_string(),
            session_ids: session_ids.to_vec(),
        };
        let url = format!("{}{}", self.base_url, ENDPOINT);
        tracing::info!(
            action_ref,
            sessions = session_ids.len(),
            "POST {ENDPOINT}"
        );

        let response = match self.http.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return self.timeout_outcome(),
            Err(e) => return GenerationOutcome::failure(format!("Falha ao chamar a API: {e}")),
        };
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return self.timeout_outcome(),
            Err(e) => {
                return GenerationOutcome::failure(format!("Falha ao ler resposta da API: {e}"));
            }
        };
        outcome_from_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_is_parsed() {
        let body = r#"{"sucesso": true, "totalSucesso": 1,
                       "sessoes": [{"rowIdSessao": 3, "pathPdf": "x.pdf", "sucesso": true}]}"#;
        let outcome = outcome_from_response(200, body);
        assert!(outcome.success);
        assert_eq!(outcome.sessions.len(), 1);
    }

    #[test]
    fn unparsable_success_body_becomes_a_failure_outcome() {
        let outcome = outcome_from_response(200, "<html>oops</html>");
        assert!(!outcome.success);
        assert!(
            outcome
                .message
                .as_deref()
                .unwrap()
                .starts_with("Resposta inválida da API")
        );
    }

    #[test]
    fn non_success_status_carries_code_and_body() {
        let outcome = outcome_from_response(502, "bad gateway");
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("HTTP 502: bad gateway"));
    }

    #[test]
    fn client_strips_trailing_slash_from_base_url() {
        let client = HttpGenerationClient::new("http://localhost:5141/", 60).unwrap();
        assert_eq!(client.base_url, "http://localhost:5141");
        assert_eq!(client.timeout_secs, 60);
    }
}
