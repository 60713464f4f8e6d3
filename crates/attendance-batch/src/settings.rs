//! Typed environment configuration, resolved once at startup.
//!
//! Everything the run needs is read here: SMTP, the two database URLs, the
//! API endpoints and the run-level knobs (test mode, recipients, deny-list,
//! date override). A missing or invalid variable is fatal: the process
//! exits 1 before the orchestrator ever starts.

use chrono::NaiveDate;
use thiserror::Error;

use attendance_gateways::SmtpSettings;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub base_url_test: String,
    pub timeout_secs: u64,
}

impl ApiSettings {
    /// Test mode points the client at the local/staging deployment.
    pub fn url(&self, test_mode: bool) -> &str {
        if test_mode {
            &self.base_url_test
        } else {
            &self.base_url
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub smtp: SmtpSettings,
    pub sessions_db_url: String,
    pub audit_db_url: String,
    pub api: ApiSettings,
    pub test_mode: bool,
    pub test_address: String,
    pub ops_address: String,
    pub pedagogy_address: String,
    pub date_override: Option<NaiveDate>,
    pub excluded_instructors: Vec<i64>,
}

fn var(name: &'static str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, SettingsError> {
    var(name).ok_or(SettingsError::Missing(name))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_codes(raw: &str) -> Result<Vec<i64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| format!("'{part}' is not an integer code"))
        })
        .collect()
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let test_mode = var("TEST_MODE").as_deref().and_then(parse_bool).unwrap_or(false);
        let test_address = if test_mode {
            required("TEST_EMAIL")?
        } else {
            var("TEST_EMAIL").unwrap_or_default()
        };

        let smtp = SmtpSettings {
            host: required("SMTP_HOST")?,
            port: match var("SMTP_PORT") {
                Some(raw) => raw.parse::<u16>().map_err(|e| SettingsError::Invalid {
                    name: "SMTP_PORT",
                    reason: e.to_string(),
                })?,
                None => 25,
            },
            sender: required("SMTP_SENDER")?,
            sender_name: var("SMTP_SENDER_NAME").or_else(|| Some("Instituto CRIAP".to_string())),
            password: var("SMTP_PASSWORD"),
            secure: var("SMTP_SECURE").as_deref().and_then(parse_bool).unwrap_or(false),
        };

        let api = ApiSettings {
            base_url: required("API_BASE_URL")?,
            base_url_test: var("API_BASE_URL_TEST")
                .unwrap_or_else(|| "http://localhost:5141".to_string()),
            timeout_secs: match var("API_TIMEOUT_SECS") {
                Some(raw) => raw.parse::<u64>().map_err(|e| SettingsError::Invalid {
                    name: "API_TIMEOUT_SECS",
                    reason: e.to_string(),
                })?,
                None => 60,
            },
        };

        let date_override = match var("DATE_OVERRIDE") {
            Some(raw) => Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                    SettingsError::Invalid {
                        name: "DATE_OVERRIDE",
                        reason: e.to_string(),
                    }
                })?,
            ),
            None => None,
        };

        let excluded_instructors = match var("EXCLUDED_INSTRUCTORS") {
            Some(raw) => parse_codes(&raw).map_err(|reason| SettingsError::Invalid {
                name: "EXCLUDED_INSTRUCTORS",
                reason,
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            smtp,
            sessions_db_url: required("DATABASE_SESSIONS_URL")?,
            audit_db_url: required("DATABASE_AUDIT_URL")?,
            api,
            test_mode,
            test_address,
            ops_address: required("OPS_EMAIL")?,
            pedagogy_address: required("PEDAGOGY_EMAIL")?,
            date_override,
            excluded_instructors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing_accepts_the_usual_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("talvez"), None);
    }

    #[test]
    fn code_list_parses_with_whitespace_and_rejects_garbage() {
        assert_eq!(parse_codes("699, 704 ,827,").unwrap(), vec![699, 704, 827]);
        assert_eq!(parse_codes("").unwrap(), Vec::<i64>::new());
        assert!(parse_codes("699,abc").is_err());
    }

    #[test]
    fn api_url_switches_on_test_mode() {
        let api = ApiSettings {
            base_url: "https://api.example.com".into(),
            base_url_test: "http://localhost:5141".into(),
            timeout_secs: 60,
        };
        assert_eq!(api.url(false), "https://api.example.com");
        assert_eq!(api.url(true), "http://localhost:5141");
    }
}
