//! JSON Output Envelope Types
//!
//! Every CLI command prints exactly one envelope to stdout.
//!
//! # Output Contract
//! - Success: `{"ok": true, "engine": "...", "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "engine": "...", "command": "...", "error": {"code": "...", "message": "..."}, "events": [...]}`
//!
//! Both envelopes carry the session's log lines when a session was opened,
//! under `meta.events` on success and `events` on failure.
//!
//! `engine` is the session's database kind (`Mysql`, `Mssql`, `PostgreSql`) or
//! an empty string for commands that do not touch a session.

use serde::{Deserialize, Serialize};

use crate::error::UdfkitError;
use crate::events::LogEvent;

/// Success envelope for operation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Database kind of the session used, or empty
    pub engine: String,

    /// Command that was executed (test, info, escalate, exec, clean, sql, session ...)
    pub command: String,

    /// Operation-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(engine: impl Into<String>, command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, engine: engine.into(), command: command.into(), data, meta }
    }
}

/// Error envelope for operation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    pub engine: String,

    pub command: String,

    pub error: ErrorInfo,

    /// Log lines emitted by the session before it failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

impl ErrorEnvelope {
    pub fn new(engine: impl Into<String>, command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, engine: engine.into(), command: command.into(), error, events: Vec::new() }
    }

    #[must_use]
    pub fn with_events(mut self, events: &[LogEvent]) -> Self {
        self.events = events.iter().map(ToString::to_string).collect();
        self
    }

    /// Create error envelope from `UdfkitError`
    pub fn from_error(engine: impl Into<String>, command: impl Into<String>, err: &UdfkitError) -> Self {
        Self::new(engine, command, ErrorInfo { code: err.error_code().to_string(), message: err.message() })
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "CATALOG_ERROR", "CONNECTION_FAILED")
    pub code: String,

    /// Human-readable error message (never includes stored passwords)
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,

    /// Number of rows returned (SQL results and session listings)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_returned: Option<usize>,

    /// Log lines emitted by the session while the command ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

impl Metadata {
    #[must_use]
    pub fn new(execution_ms: u64) -> Self {
        Self { execution_ms, ..Self::default() }
    }

    #[must_use]
    pub fn with_rows(mut self, rows_returned: usize) -> Self {
        self.rows_returned = Some(rows_returned);
        self
    }

    /// Attach collected session events, rendered as `[timestamp] message`
    #[must_use]
    pub fn with_events(mut self, events: &[LogEvent]) -> Self {
        self.events = events.iter().map(ToString::to_string).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LogLevel;

    #[test]
    fn test_success_envelope_serialization() {
        let envelope = SuccessEnvelope::new(
            "Mysql",
            "sql",
            serde_json::json!({"result": "test"}),
            Metadata::new(42).with_rows(10),
        );

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""ok":true"#));
        assert!(json.contains(r#""engine":"Mysql"#));
        assert!(json.contains(r#""command":"sql"#));
        assert!(json.contains(r#""execution_ms":42"#));
        assert!(json.contains(r#""rows_returned":10"#));
        assert!(!json.contains("events"));
    }

    #[test]
    fn test_error_envelope_from_udfkit_error() {
        let err = UdfkitError::catalog_error("Session 9 not found");
        let envelope = ErrorEnvelope::from_error("", "session show", &err);

        assert!(!envelope.ok);
        assert_eq!(envelope.command, "session show");
        assert_eq!(envelope.error.code, "CATALOG_ERROR");
        assert!(envelope.error.message.contains("Session 9 not found"));
    }

    #[test]
    fn test_error_envelope_keeps_session_events() {
        let err = UdfkitError::query_failed("Table 'mysql.nowhere' doesn't exist");
        let events = vec![
            LogEvent::now(LogLevel::Info, "Connected to 10.0.0.5:3306"),
            LogEvent::now(LogLevel::Error, "SQL failed: Table 'mysql.nowhere' doesn't exist"),
        ];
        let envelope = ErrorEnvelope::from_error("Mysql", "sql", &err).with_events(&events);

        assert_eq!(envelope.events.len(), 2);
        assert!(envelope.events[0].ends_with("Connected to 10.0.0.5:3306"));
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""events":["#));

        let bare = serde_json::to_string(&ErrorEnvelope::from_error("", "session show", &err)).unwrap();
        assert!(!bare.contains("events"));
    }

    #[test]
    fn test_metadata_carries_events() {
        let events = vec![
            LogEvent::now(LogLevel::Info, "Connecting to 10.0.0.5:3306"),
            LogEvent::now(LogLevel::Info, "Connection established"),
        ];
        let meta = Metadata::new(5).with_events(&events);

        assert_eq!(meta.events.len(), 2);
        assert!(meta.events[0].starts_with('['));
        assert!(meta.events[1].ends_with("Connection established"));
        assert!(!serde_json::to_string(&meta).unwrap().contains("rows_returned"));
    }
}
