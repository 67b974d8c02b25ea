//! udfkit - Session Catalog and MySQL UDF Workflow Toolkit
//!
//! udfkit keeps a catalog of saved database sessions and, for MySQL targets,
//! drives the user-defined-function workflow used during authorized
//! assessments: fingerprint the server, upload and register a native library,
//! run operating-system commands through it, run arbitrary SQL, and drop the
//! registered functions afterwards.
//!
//! # Core Principles
//! - Workflow operations report failures as values or log events, never panics
//! - All progress goes to a caller-supplied [`EventSink`], no global log state
//! - The CLI prints one JSON envelope per command
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`events`] - Log events and sinks
//! - [`session`] - Saved session records
//! - [`catalog`] - SQLite-backed session store
//! - [`engine`] - Database kinds, session drivers and the MySQL handle
//! - [`capability`] - Which kinds support which operations
//! - [`artifact`] - Platform selection and payload loading
//! - [`statement`] - SQL classification and quoting
//! - [`config`] - Configuration management
//! - [`output`] - JSON output envelope types

pub mod artifact;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod output;
pub mod session;
pub mod statement;

pub use artifact::{ArtifactPayload, ArtifactStore, Platform};
pub use capability::Capability;
pub use catalog::SessionCatalog;
pub use config::{load_with_precedence, resolve_settings, ConfigLocation, Settings, SettingsFile};
pub use engine::mysql::{fingerprint_server, EscalationReport};
pub use engine::{
    ConnectionState, DatabaseKind, MySqlHandle, OutputEncoding, ResultSet, ServerFingerprint,
    SessionDriver, SqlChannel, SqlOutcome, SqlPayload,
};
pub use error::{EscalationError, Result, UdfkitError};
pub use events::{ChannelSink, EventSink, FanoutSink, LogEvent, LogLevel, MemorySink, SharedSink, TracingSink};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use session::{ProxySettings, SessionRecord, Transport, TunnelSettings};
pub use statement::StatementKind;
