//! MySQL Session Driver
//!
//! [`MySqlHandle`] owns the live connection for one session and drives the
//! UDF workflow over it.
//!
//! # Features
//! - Client-server connections via TCP, session charset `utf8mb4`
//! - Server fingerprinting (version, compiled OS, compiled machine)
//! - UDF escalation, command execution and trace cleanup
//! - Generic SQL execution with row-set / affected-count classification
//!
//! # Connection Lifecycle
//! `Closed → Connecting → Open → Closed`. Every operation reopens a closed
//! handle first, and a transport-level failure (I/O error, connection closed)
//! drops the connection so the next operation reconnects. Server-side SQL errors
//! leave the connection open.
//!
//! # Implementation Notes
//! - Uses `mysql_async` (async driver, requires tokio runtime)
//! - Connect timeout enforced via `tokio::time::timeout`
//! - No deadline on individual statements: a hung server blocks the caller.
//!   Wrap calls in `tokio::time::timeout` when a deadline is needed.
//! - Operations take `&mut self`, so one handle never runs two statements at once
//! - Against an unreachable server each operation makes one connect attempt,
//!   so it waits at most `timeout_secs` before failing. Fingerprinting and
//!   cleanup stop at the first connection failure.
//! - BLOB data is Base64-encoded for JSON safety

use mysql_async::{prelude::*, Conn, Opts, OptsBuilder, Row, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::artifact::ArtifactStore;
use crate::capability::{self, Capability};
use crate::engine::{OutputEncoding, ResultSet, ServerFingerprint, SqlChannel, SqlOutcome};
use crate::error::{EscalationError, Result, UdfkitError};
use crate::events::{EventSink, SharedSink};
use crate::session::{SessionRecord, Transport};

pub mod cleanup;
pub mod command;
pub mod escalation;
pub mod sql;

#[cfg(test)]
pub(crate) mod test_support;

pub use escalation::EscalationReport;

/// Name of the function registered by escalation and invoked by commands
pub const UDF_FUNCTION: &str = "sys_eval";

/// Every function name escalation has ever registered, dropped by cleanup
pub const CLEANUP_FUNCTIONS: [&str; 2] = [UDF_FUNCTION, "sys_exec"];

/// Connection state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

/// Live connection to one MySQL target
///
/// Every statement on a closed handle first tries to connect, waiting up to
/// the record's `timeout_secs`.
pub struct MySqlHandle {
    record: SessionRecord,
    sink: SharedSink,
    conn: Option<Conn>,
    state: ConnectionState,
    fingerprint: ServerFingerprint,
    escalated: bool,
}

impl MySqlHandle {
    /// Create a closed handle for `record`
    #[must_use]
    pub fn new(record: SessionRecord, sink: SharedSink) -> Self {
        Self {
            record,
            sink,
            conn: None,
            state: ConnectionState::Closed,
            fingerprint: ServerFingerprint::default(),
            escalated: false,
        }
    }

    /// Create a handle and connect it
    pub async fn open(record: SessionRecord, sink: SharedSink) -> Result<Self> {
        let mut handle = Self::new(record, sink);
        handle.connect().await?;
        Ok(handle)
    }

    #[must_use]
    pub const fn record(&self) -> &SessionRecord {
        &self.record
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, ConnectionState::Open)
    }

    /// Fingerprint cached by the last [`Self::fingerprint`] call
    #[must_use]
    pub const fn cached_fingerprint(&self) -> &ServerFingerprint {
        &self.fingerprint
    }

    /// Whether escalation succeeded on this handle
    #[must_use]
    pub const fn is_escalated(&self) -> bool {
        self.escalated
    }

    /// Open the transport; a no-op when already open
    ///
    /// Failures are logged and returned, never retried.
    pub async fn connect(&mut self) -> Result<()> {
        capability::require(self.record.kind, Capability::Connect)?;
        if self.conn.is_some() {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        let address = self.record.address();

        if let Transport::HttpTunnel(tunnel) = &self.record.transport {
            self.sink.warn(&format!(
                "HTTP tunnel {} is not supported yet, connecting to {address} directly",
                tunnel.url
            ));
        }

        let opts = match build_mysql_opts(&self.record) {
            Ok(opts) => opts,
            Err(e) => {
                self.state = ConnectionState::Closed;
                self.sink.error(&e.message());
                return Err(e);
            }
        };

        let timeout = Duration::from_secs(self.record.timeout_secs.max(1));
        let result = match tokio::time::timeout(timeout, Conn::new(opts)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(UdfkitError::connection_failed(format!(
                "Failed to connect to MySQL at {address}: {e}"
            ))),
            Err(_) => Err(UdfkitError::connection_failed(format!(
                "Connecting to MySQL at {address} timed out after {}s",
                timeout.as_secs()
            ))),
        };

        match result {
            Ok(conn) => {
                self.conn = Some(conn);
                self.state = ConnectionState::Open;
                self.sink.info(&format!("Connected to {address}"));
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Closed;
                self.sink.error(&e.message());
                Err(e)
            }
        }
    }

    /// Round-trip `SELECT 1`; reports failure as `false`
    pub async fn test(&mut self) -> bool {
        match self.query("SELECT 1").await {
            Ok(_) => {
                self.sink.info("Connection test succeeded");
                true
            }
            Err(e) => {
                self.sink.error(&format!("Connection test failed: {e}"));
                false
            }
        }
    }

    /// Fetch and cache version, compiled OS and compiled machine
    pub async fn fingerprint(&mut self) -> &ServerFingerprint {
        let sink = Arc::clone(&self.sink);
        self.fingerprint = fingerprint_server(self, sink.as_ref()).await;
        &self.fingerprint
    }

    /// Run escalation, returning the detailed outcome
    ///
    /// Fingerprints first when the compiled OS is not cached yet.
    pub async fn try_escalate(
        &mut self,
        artifacts: &ArtifactStore,
    ) -> std::result::Result<EscalationReport, EscalationError> {
        if !self.fingerprint.has_os() {
            self.fingerprint().await;
        }

        let sink = Arc::clone(&self.sink);
        let fingerprint = self.fingerprint.clone();
        let outcome = escalation::escalate(self, sink.as_ref(), &fingerprint, artifacts).await;

        match &outcome {
            Ok(_) => self.escalated = true,
            Err(e) => sink.error(&format!("UDF escalation failed: {e}")),
        }
        outcome
    }

    /// Run escalation; `true` only if every step succeeded
    pub async fn escalate(&mut self, artifacts: &ArtifactStore) -> bool {
        self.try_escalate(artifacts).await.is_ok()
    }

    /// Run `command` on the target host through the registered function
    pub async fn execute_command(&mut self, command: &str, encoding: OutputEncoding) -> String {
        let sink = Arc::clone(&self.sink);
        command::execute_command(self, sink.as_ref(), command, encoding).await
    }

    /// Drop every function escalation may have registered; never fails
    pub async fn clean(&mut self) {
        let sink = Arc::clone(&self.sink);
        cleanup::clean(self, sink.as_ref()).await;
    }

    /// Run an arbitrary statement
    pub async fn execute_sql(&mut self, statement: &str) -> SqlOutcome {
        let sink = Arc::clone(&self.sink);
        sql::execute_sql(self, sink.as_ref(), statement).await
    }

    /// Release the transport; safe to call repeatedly
    pub async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.disconnect().await {
                Ok(()) => self.sink.info("Connection closed"),
                Err(e) => self.sink.warn(&format!("Connection closed with error: {e}")),
            }
        }
        self.state = ConnectionState::Closed;
    }

    async fn ensure_open(&mut self) -> Result<&mut Conn> {
        if self.conn.is_none() {
            if self.state == ConnectionState::Open {
                self.sink.warn("Connection lost, reconnecting");
            }
            self.connect().await?;
        }
        self.conn
            .as_mut()
            .ok_or_else(|| UdfkitError::connection_failed("Connection is not open"))
    }

    /// Translate a driver error, dropping the connection if the transport died
    fn absorb<T>(&mut self, outcome: mysql_async::Result<T>) -> Result<T> {
        outcome.map_err(|e| {
            if is_transport_error(&e) {
                self.conn = None;
                self.state = ConnectionState::Closed;
                self.sink.warn(&format!("Connection to {} dropped: {e}", self.record.address()));
                UdfkitError::connection_failed(e.to_string())
            } else {
                UdfkitError::query_failed(e.to_string())
            }
        })
    }
}

impl SqlChannel for MySqlHandle {
    async fn query(&mut self, sql: &str) -> Result<ResultSet> {
        let conn = self.ensure_open().await?;
        let outcome = run_query(conn, sql).await;
        self.absorb(outcome)
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let conn = self.ensure_open().await?;
        let outcome = run_execute(conn, sql).await;
        self.absorb(outcome)
    }
}

/// Build MySQL connection options from a session record
fn build_mysql_opts(record: &SessionRecord) -> Result<Opts> {
    if record.host.trim().is_empty() {
        return Err(UdfkitError::invalid_input("MySQL requires 'host' parameter"));
    }

    if record.port == 0 {
        return Err(UdfkitError::invalid_input("MySQL requires a non-zero 'port' parameter"));
    }

    if record.username.is_empty() {
        return Err(UdfkitError::invalid_input("MySQL requires 'user' parameter"));
    }

    let database = (!record.database.is_empty()).then(|| record.database.clone());

    let opts = OptsBuilder::default()
        .ip_or_hostname(record.host.trim())
        .tcp_port(record.port)
        .user(Some(record.username.clone()))
        .pass(Some(record.password.clone()))
        .db_name(database)
        .prefer_socket(false)
        .init(vec!["SET NAMES utf8mb4", "SET autocommit = 1"]);

    Ok(Opts::from(opts))
}

fn is_transport_error(err: &mysql_async::Error) -> bool {
    matches!(
        err,
        mysql_async::Error::Io(_) | mysql_async::Error::Driver(mysql_async::DriverError::ConnectionClosed)
    )
}

async fn run_query(conn: &mut Conn, sql: &str) -> mysql_async::Result<ResultSet> {
    let result = conn.query_iter(sql).await?;
    let columns: Vec<String> = result
        .columns_ref()
        .iter()
        .map(|col| col.name_str().to_string())
        .collect();

    let rows: Vec<Row> = result.collect_and_drop().await?;
    let rows = rows
        .into_iter()
        .map(|row| (0..row.len()).map(|idx| row.as_ref(idx).cloned().unwrap_or(Value::NULL)).collect())
        .collect();

    Ok(ResultSet { columns, rows })
}

async fn run_execute(conn: &mut Conn, sql: &str) -> mysql_async::Result<u64> {
    let result = conn.query_iter(sql).await?;
    let affected = result.affected_rows();
    result.drop_result().await?;
    Ok(affected)
}

const FINGERPRINT_QUERIES: [(&str, &str); 3] = [
    ("MySQL version", "SELECT VERSION()"),
    ("Compiled OS", "SELECT @@version_compile_os"),
    ("Compiled machine", "SELECT @@version_compile_machine"),
];

/// Query the three fingerprint values independently
///
/// A failed query leaves only its own field unset. Once the connection is
/// gone the remaining queries are skipped.
pub async fn fingerprint_server<C: SqlChannel>(
    channel: &mut C,
    sink: &dyn EventSink,
) -> ServerFingerprint {
    let mut values: [Option<String>; 3] = Default::default();

    for (slot, (label, sql)) in values.iter_mut().zip(FINGERPRINT_QUERIES) {
        match fetch_scalar(channel, sink, label, sql).await {
            Ok(value) => *slot = value,
            Err(e) if e.is_connection_error() => {
                sink.warn("Server unreachable, skipping remaining fingerprint queries");
                break;
            }
            Err(_) => {}
        }
    }

    let [version, os, machine] = values;
    ServerFingerprint { version, os, machine }
}

async fn fetch_scalar<C: SqlChannel>(
    channel: &mut C,
    sink: &dyn EventSink,
    label: &str,
    sql: &str,
) -> Result<Option<String>> {
    match channel.query(sql).await {
        Ok(result) => match result.first_value(0).and_then(value_to_text) {
            Some(value) => {
                sink.info(&format!("{label}: {value}"));
                Ok(Some(value))
            }
            None => {
                sink.warn(&format!("{label}: no value returned"));
                Ok(None)
            }
        },
        Err(e) => {
            sink.warn(&format!("Failed to query {label}: {e}"));
            Err(e)
        }
    }
}

/// Parse MySQL version string to detect MySQL vs MariaDB
pub(crate) fn parse_mysql_version(version_string: &str) -> (String, String) {
    // Example MySQL: "8.0.35"
    // Example MariaDB: "10.11.2-MariaDB"

    if version_string.to_uppercase().contains("MARIADB") {
        let version = version_string
            .trim_start_matches("5.5.5-")
            .split('-')
            .next()
            .unwrap_or("unknown")
            .to_string();
        (version.clone(), format!("MariaDB {version}"))
    } else {
        let version = version_string
            .split(['-', ' '])
            .next()
            .unwrap_or(version_string)
            .to_string();
        (version.clone(), format!("MySQL {version}"))
    }
}

/// Render a scalar as text; `None` for NULL
pub(crate) fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(d) => Some(d.to_string()),
        other => Some(other.as_sql(true).trim_matches('\'').to_string()),
    }
}

/// Convert MySQL value to JSON value
pub(crate) fn mysql_value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::NULL => serde_json::Value::Null,

        Value::Bytes(bytes) => {
            if let Ok(s) = std::str::from_utf8(bytes) {
                serde_json::Value::String(s.to_string())
            } else {
                // Binary data - encode as Base64
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }

        Value::Int(i) => serde_json::Value::Number((*i).into()),

        Value::UInt(u) => serde_json::json!(*u),

        Value::Float(f) => serde_json::Number::from_f64(f64::from(*f))
            .map_or(serde_json::Value::Null, serde_json::Value::Number),

        Value::Double(d) => serde_json::Number::from_f64(*d)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),

        Value::Date(year, month, day, hour, minute, second, micro) => serde_json::Value::String(format!(
            "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{micro:06}"
        )),

        Value::Time(is_negative, days, hours, minutes, seconds, microseconds) => {
            let sign = if *is_negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(*hours);
            serde_json::Value::String(format!(
                "{sign}{total_hours}:{minutes:02}:{seconds:02}.{microseconds:06}"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{rows, Response, ScriptedChannel};
    use super::*;
    use crate::engine::DatabaseKind;
    use crate::events::MemorySink;

    #[test]
    fn test_parse_mysql_version() {
        let (version, info) = parse_mysql_version("8.0.35");
        assert_eq!(version, "8.0.35");
        assert_eq!(info, "MySQL 8.0.35");

        let (version, info) = parse_mysql_version("5.7.44-log");
        assert_eq!(version, "5.7.44");
        assert_eq!(info, "MySQL 5.7.44");

        let (version, info) = parse_mysql_version("10.11.2-MariaDB");
        assert_eq!(version, "10.11.2");
        assert_eq!(info, "MariaDB 10.11.2");

        let (version, _) = parse_mysql_version("5.5.5-10.6.12-MariaDB-0ubuntu0.22.04.1");
        assert_eq!(version, "10.6.12");
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&Value::NULL), None);
        assert_eq!(value_to_text(&Value::Bytes(b"Linux".to_vec())).as_deref(), Some("Linux"));
        assert_eq!(value_to_text(&Value::Int(-4)).as_deref(), Some("-4"));
        assert_eq!(value_to_text(&Value::UInt(64)).as_deref(), Some("64"));
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(mysql_value_to_json(&Value::NULL), serde_json::Value::Null);
        assert_eq!(mysql_value_to_json(&Value::Bytes(b"root".to_vec())), serde_json::json!("root"));
        assert_eq!(mysql_value_to_json(&Value::Bytes(vec![0xff, 0x00])), serde_json::json!("/wA="));
        assert_eq!(mysql_value_to_json(&Value::Int(7)), serde_json::json!(7));
        assert_eq!(mysql_value_to_json(&Value::Double(f64::NAN)), serde_json::Value::Null);
        assert_eq!(
            mysql_value_to_json(&Value::Date(2024, 1, 2, 3, 4, 5, 0)),
            serde_json::json!("2024-01-02T03:04:05.000000")
        );
        assert_eq!(
            mysql_value_to_json(&Value::Time(true, 1, 2, 3, 4, 0)),
            serde_json::json!("-26:03:04.000000")
        );
    }

    #[test]
    fn test_build_opts_requires_host_and_user() {
        let record = SessionRecord::mysql("", "root", "pw");
        let err = build_mysql_opts(&record).unwrap_err();
        assert!(err.message().contains("MySQL requires 'host' parameter"));

        let record = SessionRecord::mysql("10.0.0.5", "", "pw");
        let err = build_mysql_opts(&record).unwrap_err();
        assert!(err.message().contains("MySQL requires 'user' parameter"));

        let record = SessionRecord::mysql("10.0.0.5", "root", "pw").with_database("mysql");
        let opts = build_mysql_opts(&record).unwrap();
        assert_eq!(opts.ip_or_hostname(), "10.0.0.5");
        assert_eq!(opts.tcp_port(), 3306);
        assert_eq!(opts.db_name(), Some("mysql"));
    }

    #[tokio::test]
    async fn test_connect_rejects_non_mysql_record() {
        let sink = Arc::new(MemorySink::new());
        let record = SessionRecord::new(DatabaseKind::PostgreSql, "10.0.0.8", 5432, "postgres", "pw");
        let mut handle = MySqlHandle::new(record, sink);

        let err = handle.connect().await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_SUPPORTED");
        assert_eq!(handle.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_failure_stays_closed_and_logs() {
        let sink = Arc::new(MemorySink::new());
        // Port 1 on localhost refuses connections
        let record = SessionRecord::new(DatabaseKind::Mysql, "127.0.0.1", 1, "root", "pw").with_timeout(5);
        let mut handle = MySqlHandle::new(record, sink.clone());

        let err = handle.connect().await.unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert!(sink.contains("127.0.0.1:1"));

        assert!(!handle.test().await);
        assert!(sink.contains("Connection test failed"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let sink = Arc::new(MemorySink::new());
        let mut handle = MySqlHandle::new(SessionRecord::mysql("10.0.0.5", "root", "pw"), sink.clone());
        handle.close().await;
        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_fingerprint_fields_are_independent() {
        let sink = MemorySink::new();
        let mut channel = ScriptedChannel::new()
            .on("SELECT VERSION()", Response::Rows(rows(&["VERSION()"], &[&["8.0.35"]])))
            .on("SELECT @@version_compile_os", Response::Fail("Unknown system variable".to_string()))
            .on(
                "SELECT @@version_compile_machine",
                Response::Rows(rows(&["@@version_compile_machine"], &[&["x86_64"]])),
            );

        let fingerprint = fingerprint_server(&mut channel, &sink).await;
        assert_eq!(fingerprint.version.as_deref(), Some("8.0.35"));
        assert_eq!(fingerprint.os, None);
        assert_eq!(fingerprint.machine.as_deref(), Some("x86_64"));
        assert_eq!(channel.statements.len(), 3);
        assert!(sink.contains("Failed to query Compiled OS"));
        assert!(sink.contains("MySQL version: 8.0.35"));
    }

    #[tokio::test]
    async fn test_fingerprint_null_value_leaves_field_unset() {
        let sink = MemorySink::new();
        let mut channel = ScriptedChannel::new()
            .on("SELECT VERSION()", Response::Rows(rows(&["VERSION()"], &[&["10.11.2-MariaDB"]])))
            .on("SELECT @@version_compile_os", Response::Rows(ResultSet::default()))
            .on("SELECT @@version_compile_machine", Response::Rows(ResultSet::default()));

        let fingerprint = fingerprint_server(&mut channel, &sink).await;
        assert_eq!(fingerprint.flavor().as_deref(), Some("MariaDB 10.11.2"));
        assert!(!fingerprint.has_os());
        assert!(sink.contains("Compiled OS: no value returned"));
    }

    #[tokio::test]
    async fn test_fingerprint_stops_after_connection_loss() {
        let sink = MemorySink::new();
        let mut channel = ScriptedChannel::new().on("SELECT", Response::Disconnected);

        let fingerprint = fingerprint_server(&mut channel, &sink).await;
        assert_eq!(fingerprint, ServerFingerprint::default());
        assert_eq!(channel.statements, vec!["SELECT VERSION()"]);
        assert!(sink.contains("Failed to query MySQL version"));
        assert!(sink.contains("skipping remaining fingerprint queries"));
    }

    fn open_handle(sink: &Arc<MemorySink>) -> MySqlHandle {
        let mut handle = MySqlHandle::new(SessionRecord::mysql("10.0.0.5", "root", "pw"), sink.clone());
        handle.state = ConnectionState::Open;
        handle
    }

    #[test]
    fn test_transport_error_drops_the_connection() {
        let sink = Arc::new(MemorySink::new());
        let mut handle = open_handle(&sink);

        let err = handle
            .absorb::<()>(Err(mysql_async::Error::Driver(mysql_async::DriverError::ConnectionClosed)))
            .unwrap_err();
        assert_eq!(err.error_code(), "CONNECTION_FAILED");
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert!(handle.conn.is_none());
        assert!(sink.contains("Connection to 10.0.0.5:3306 dropped"));

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let mut handle = open_handle(&sink);
        let err = handle.absorb::<()>(Err(mysql_async::Error::Io(io.into()))).unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(handle.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_server_error_keeps_the_connection_state() {
        let sink = Arc::new(MemorySink::new());
        let mut handle = open_handle(&sink);

        let server_error = mysql_async::ServerError {
            code: 1064,
            message: "You have an error in your SQL syntax".to_string(),
            state: "42000".to_string(),
        };
        let err = handle.absorb::<()>(Err(mysql_async::Error::Server(server_error))).unwrap_err();
        assert_eq!(err.error_code(), "QUERY_FAILED");
        assert!(err.message().contains("SQL syntax"));
        assert_eq!(handle.state(), ConnectionState::Open);
        assert!(!sink.contains("dropped"));

        assert_eq!(handle.absorb(Ok(7_u64)).unwrap(), 7);
        assert_eq!(handle.state(), ConnectionState::Open);
    }

    // Note: tests against a live server require a running MySQL instance.
    // They are marked with #[ignore] and read UDFKIT_TEST_MYSQL_HOST / _USER / _PASSWORD:
    // cargo test -- --ignored

    #[tokio::test]
    #[ignore] // Requires running MySQL instance
    async fn test_live_connect_and_fingerprint() {
        let host = std::env::var("UDFKIT_TEST_MYSQL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let user = std::env::var("UDFKIT_TEST_MYSQL_USER").unwrap_or_else(|_| "root".to_string());
        let password = std::env::var("UDFKIT_TEST_MYSQL_PASSWORD").unwrap_or_default();

        let sink = Arc::new(MemorySink::new());
        let mut handle = MySqlHandle::open(SessionRecord::mysql(host, user, password), sink.clone())
            .await
            .expect("connect");
        assert!(handle.is_open());
        assert!(handle.test().await);

        let fingerprint = handle.fingerprint().await.clone();
        assert!(fingerprint.version.is_some());
        assert!(fingerprint.os.is_some());

        let outcome = handle.execute_sql("SELECT 1 AS one").await;
        assert!(outcome.ok);
        assert_eq!(outcome.columns, vec!["one"]);

        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Closed);
    }
}
