//! Database Engine Traits and Core Types
//!
//! This module defines the core abstractions shared by the session drivers.
//!
//! # Driver Kinds
//! The set of [`DatabaseKind`]s is closed. Only MySQL has a working driver
//! ([`mysql::MySqlHandle`]); the other kinds are represented by
//! [`SessionDriver::Unsupported`], which answers every operation with
//! "not supported".
//!
//! # SQL Channel
//! The escalation, command, cleanup and SQL modules are written against the
//! [`SqlChannel`] trait rather than a concrete connection, so the workflow is
//! the same whether it runs over a live `mysql_async` connection or a scripted
//! channel in tests.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::artifact::ArtifactStore;
use crate::capability::{self, Capability};
use crate::error::Result;
use crate::events::{EventSink, SharedSink};
use crate::session::SessionRecord;

pub mod mysql;

pub use mysql::{MySqlHandle, ConnectionState};

/// Supported database kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseKind {
    /// `MySQL` (includes `MariaDB`)
    Mysql,
    /// Microsoft SQL Server (stub)
    Mssql,
    /// `PostgreSQL` (stub)
    PostgreSql,
}

impl DatabaseKind {
    /// Name as stored in the catalog
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "Mysql",
            Self::Mssql => "Mssql",
            Self::PostgreSql => "PostgreSql",
        }
    }

    /// Catalog label for the `database_type` column
    #[must_use]
    pub const fn catalog_label(&self) -> &'static str {
        self.as_str()
    }

    /// Parse a catalog label, tolerating case and common aliases
    #[must_use]
    pub fn from_catalog_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::Mysql),
            "mssql" | "sqlserver" => Some(Self::Mssql),
            "postgresql" | "postgres" => Some(Self::PostgreSql),
            _ => None,
        }
    }

    /// Conventional server port
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Mysql => 3306,
            Self::Mssql => 1433,
            Self::PostgreSql => 5432,
        }
    }
}

impl std::fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatabaseKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_catalog_label(s).ok_or_else(|| format!("unknown database kind '{s}'"))
    }
}

/// Character set used to decode command output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "gb2312")]
    Gb2312,
    #[serde(rename = "gbk")]
    Gbk,
}

impl OutputEncoding {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Gb2312 => "gb2312",
            Self::Gbk => "gbk",
        }
    }

    /// Decode raw output bytes, replacing invalid sequences
    ///
    /// GB2312 is decoded with the GBK table, which is a superset of it.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        let encoding = match self {
            Self::Utf8 => encoding_rs::UTF_8,
            Self::Gb2312 | Self::Gbk => encoding_rs::GBK,
        };
        let (text, _, _) = encoding.decode(bytes);
        text.into_owned()
    }
}

impl FromStr for OutputEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "gb2312" => Ok(Self::Gb2312),
            "gbk" => Ok(Self::Gbk),
            other => Err(format!("unknown output encoding '{other}' (expected utf-8, gb2312 or gbk)")),
        }
    }
}

/// Server facts used to choose an escalation artifact
///
/// Each field is fetched independently; a missing value leaves the field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFingerprint {
    /// `VERSION()`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// `@@version_compile_os`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,

    /// `@@version_compile_machine`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
}

impl ServerFingerprint {
    /// True once the compiled OS is known, which is what artifact selection needs
    #[must_use]
    pub const fn has_os(&self) -> bool {
        self.os.is_some()
    }

    /// `MySQL 8.0.35` / `MariaDB 10.11.2`, if the version is known
    #[must_use]
    pub fn flavor(&self) -> Option<String> {
        self.version.as_deref().map(|v| mysql::parse_mysql_version(v).1)
    }
}

/// Rows returned by a query, values kept in driver form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<mysql_async::Value>>,
}

impl ResultSet {
    /// Value at `column` of the first row
    #[must_use]
    pub fn first_value(&self, column: usize) -> Option<&mysql_async::Value> {
        self.rows.first().and_then(|row| row.get(column))
    }
}

/// Row-set or message payload of a SQL execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlPayload {
    /// Rows, each an ordered list of JSON-safe values
    Rows(Vec<Vec<serde_json::Value>>),
    /// Affected-row summary or error text
    Message(String),
}

/// Outcome of the generic SQL executor
///
/// Failures are reported in-band (`ok == false`) so callers can render every
/// outcome the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlOutcome {
    pub ok: bool,
    pub payload: SqlPayload,
    pub columns: Vec<String>,
}

impl SqlOutcome {
    #[must_use]
    pub fn rows(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { ok: true, payload: SqlPayload::Rows(rows), columns }
    }

    #[must_use]
    pub fn affected(count: u64) -> Self {
        Self { ok: true, payload: SqlPayload::Message(format!("{count} rows affected")), columns: Vec::new() }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self { ok: false, payload: SqlPayload::Message(message.into()), columns: Vec::new() }
    }
}

/// Statement channel the MySQL workflow runs over
///
/// Implementations own reconnection: a call on a closed channel opens it first.
pub trait SqlChannel: Send {
    /// Run a statement expected to return rows
    fn query(&mut self, sql: &str) -> impl std::future::Future<Output = Result<ResultSet>> + Send;

    /// Run a statement for its side effect and return the affected-row count
    fn execute(&mut self, sql: &str) -> impl std::future::Future<Output = Result<u64>> + Send;
}

/// A session's driver, selected by database kind
///
/// Only the MySQL variant talks to a server. The unsupported variant keeps the
/// same surface and reports "not supported" from every operation.
pub enum SessionDriver {
    MySql(MySqlHandle),
    Unsupported { kind: DatabaseKind, sink: SharedSink },
}

impl SessionDriver {
    /// Build the driver for `record` without connecting
    #[must_use]
    pub fn new(record: SessionRecord, sink: SharedSink) -> Self {
        match record.kind {
            DatabaseKind::Mysql => Self::MySql(MySqlHandle::new(record, sink)),
            kind => Self::Unsupported { kind, sink },
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DatabaseKind {
        match self {
            Self::MySql(_) => DatabaseKind::Mysql,
            Self::Unsupported { kind, .. } => *kind,
        }
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        capability::supports(self.kind(), capability)
    }

    fn report_unsupported(kind: DatabaseKind, sink: &dyn EventSink, capability: Capability) -> String {
        let message = format!("{kind} does not support {capability}");
        sink.warn(&message);
        message
    }

    pub async fn connect(&mut self) -> Result<()> {
        match self {
            Self::MySql(handle) => handle.connect().await,
            Self::Unsupported { kind, sink } => {
                Self::report_unsupported(*kind, sink.as_ref(), Capability::Connect);
                capability::require(*kind, Capability::Connect)
            }
        }
    }

    pub async fn test(&mut self) -> bool {
        match self {
            Self::MySql(handle) => handle.test().await,
            Self::Unsupported { kind, sink } => {
                Self::report_unsupported(*kind, sink.as_ref(), Capability::Test);
                false
            }
        }
    }

    pub async fn fingerprint(&mut self) -> ServerFingerprint {
        match self {
            Self::MySql(handle) => handle.fingerprint().await.clone(),
            Self::Unsupported { kind, sink } => {
                Self::report_unsupported(*kind, sink.as_ref(), Capability::Fingerprint);
                ServerFingerprint::default()
            }
        }
    }

    pub async fn escalate(&mut self, artifacts: &ArtifactStore) -> bool {
        match self {
            Self::MySql(handle) => handle.escalate(artifacts).await,
            Self::Unsupported { kind, sink } => {
                Self::report_unsupported(*kind, sink.as_ref(), Capability::Escalate);
                false
            }
        }
    }

    pub async fn execute_command(&mut self, command: &str, encoding: OutputEncoding) -> String {
        match self {
            Self::MySql(handle) => handle.execute_command(command, encoding).await,
            Self::Unsupported { kind, sink } => {
                Self::report_unsupported(*kind, sink.as_ref(), Capability::Command)
            }
        }
    }

    pub async fn clean(&mut self) {
        match self {
            Self::MySql(handle) => handle.clean().await,
            Self::Unsupported { kind, sink } => {
                Self::report_unsupported(*kind, sink.as_ref(), Capability::Clean);
            }
        }
    }

    pub async fn execute_sql(&mut self, sql: &str) -> SqlOutcome {
        match self {
            Self::MySql(handle) => handle.execute_sql(sql).await,
            Self::Unsupported { kind, sink } => {
                SqlOutcome::failed(Self::report_unsupported(*kind, sink.as_ref(), Capability::Sql))
            }
        }
    }

    pub async fn close(&mut self) {
        if let Self::MySql(handle) = self {
            handle.close().await;
        }
    }
}
