//! Run-scoped log buffer.
//!
//! Collects timestamped, leveled entries for the transcript embedded in the
//! final report email, mirroring each entry to `tracing` as it is recorded.
//! The buffer owns no I/O: error alerting is the orchestrator's decision,
//! not a side effect of logging.

use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Ok,
    Warn,
    Error,
}

impl LogLevel {
    /// Label shown in the (Portuguese) report transcript.
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Ok => "OK",
            LogLevel::Warn => "AVISO",
            LogLevel::Error => "ERRO",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn ok(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Ok, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    fn push(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Ok => tracing::info!(status = "ok", "{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
        self.entries.push(LogEntry {
            at: Local::now(),
            level,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_buffered_in_order_with_levels() {
        let mut log = RunLog::new();
        log.info("starting");
        log.ok("sent");
        log.warn("odd");
        log.error("broke");

        let levels: Vec<LogLevel> = log.entries().iter().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![LogLevel::Info, LogLevel::Ok, LogLevel::Warn, LogLevel::Error]
        );
        assert_eq!(log.entries()[3].message, "broke");
    }

    #[test]
    fn portuguese_labels_match_the_report_vocabulary() {
        assert_eq!(LogLevel::Warn.label(), "AVISO");
        assert_eq!(LogLevel::Error.label(), "ERRO");
    }
}
