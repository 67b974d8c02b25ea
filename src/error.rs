//! Error Handling Infrastructure
//!
//! This module defines the error types used throughout udfkit.
//! All errors are structured and map to stable error codes for JSON output.
//!
//! # Error Categories
//! - `ConnectionFailed`: transport refused, authentication rejected, connect timeout
//! - `QueryFailed`: SQL-level failure reported by the server
//! - `InvalidInput`: malformed input or missing required parameters
//! - `NotSupported`: operation requested on a driver kind without a working driver
//! - `CatalogError`: session catalog storage errors
//! - `ConfigError`: configuration file errors
//! - `ArtifactError`: escalation payload could not be read or is malformed
//! - `EngineError`: engine-specific failures outside the categories above
//!
//! Escalation failures have their own [`EscalationError`] type because the
//! escalation workflow reports a boolean outcome plus a logged reason.

use thiserror::Error;

/// Main error type for udfkit operations
#[derive(Error, Debug)]
pub enum UdfkitError {
    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The driver for this database kind does not implement the operation
    #[error("{kind} does not support {operation}")]
    NotSupported { kind: String, operation: String },

    /// Session catalog error (storage unavailable, corrupt row, etc.)
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// Configuration error (file not found, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Escalation payload error
    #[error("Artifact error: {0}")]
    ArtifactError(String),

    /// Engine-specific database error
    #[error("Engine error ({engine}): {detail}")]
    EngineError { engine: String, detail: String },
}

impl UdfkitError {
    /// Convert error to error code string for JSON output
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotSupported { .. } => "NOT_SUPPORTED",
            Self::CatalogError(_) => "CATALOG_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ArtifactError(_) => "ARTIFACT_ERROR",
            Self::EngineError { .. } => "ENGINE_ERROR",
        }
    }

    /// Get human-readable error message
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether the error means the transport is gone and the handle must reconnect
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_))
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a not-supported error for a driver kind
    pub fn not_supported(kind: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::NotSupported { kind: kind.into(), operation: operation.into() }
    }

    /// Create a catalog error
    pub fn catalog_error(message: impl Into<String>) -> Self {
        Self::CatalogError(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an artifact error
    pub fn artifact_error(message: impl Into<String>) -> Self {
        Self::ArtifactError(message.into())
    }

    /// Create an engine-specific error
    pub fn engine_error(engine: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::EngineError { engine: engine.into(), detail: detail.into() }
    }
}

impl From<rusqlite::Error> for UdfkitError {
    fn from(err: rusqlite::Error) -> Self {
        Self::CatalogError(err.to_string())
    }
}

/// Reasons the escalation workflow aborts
///
/// None of these trigger a rollback: whatever already happened on the server stays.
#[derive(Error, Debug)]
pub enum EscalationError {
    #[error("server did not report a plugin directory")]
    MissingPluginDir,

    #[error("unsupported platform: os={os:?} machine={machine:?}")]
    UnsupportedPlatform { os: String, machine: String },

    #[error(transparent)]
    Artifact(UdfkitError),

    #[error("failed to query plugin directory: {0}")]
    PluginDirQuery(UdfkitError),

    #[error("failed to write library to {path}: {source}")]
    Upload { path: String, source: UdfkitError },

    #[error("failed to register function {function}: {source}")]
    Registration { function: String, source: UdfkitError },
}

impl From<EscalationError> for UdfkitError {
    fn from(err: EscalationError) -> Self {
        match err {
            EscalationError::Artifact(inner) => inner,
            EscalationError::PluginDirQuery(source)
            | EscalationError::Upload { source, .. }
            | EscalationError::Registration { source, .. }
                if source.is_connection_error() =>
            {
                source
            }
            other => Self::engine_error("Mysql", other.to_string()),
        }
    }
}

/// Result type alias for udfkit operations
pub type Result<T> = std::result::Result<T, UdfkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(UdfkitError::connection_failed("test").error_code(), "CONNECTION_FAILED");
        assert_eq!(UdfkitError::query_failed("test").error_code(), "QUERY_FAILED");
        assert_eq!(UdfkitError::invalid_input("test").error_code(), "INVALID_INPUT");
        assert_eq!(UdfkitError::not_supported("Mssql", "connect").error_code(), "NOT_SUPPORTED");
        assert_eq!(UdfkitError::catalog_error("test").error_code(), "CATALOG_ERROR");
        assert_eq!(UdfkitError::config_error("test").error_code(), "CONFIG_ERROR");
        assert_eq!(UdfkitError::artifact_error("test").error_code(), "ARTIFACT_ERROR");
        assert_eq!(UdfkitError::engine_error("mysql", "test").error_code(), "ENGINE_ERROR");
    }

    #[test]
    fn test_error_messages() {
        let err = UdfkitError::not_supported("PostgreSql", "escalate");
        assert_eq!(err.message(), "PostgreSql does not support escalate");

        let err = UdfkitError::engine_error("mysql", "connection timeout");
        assert!(err.message().contains("mysql"));
        assert!(err.message().contains("connection timeout"));
    }

    #[test]
    fn test_connection_error_classification() {
        assert!(UdfkitError::connection_failed("reset by peer").is_connection_error());
        assert!(!UdfkitError::query_failed("syntax").is_connection_error());
    }

    #[test]
    fn test_escalation_error_messages() {
        let err = EscalationError::Upload {
            path: "/usr/lib/mysql/plugin/lib_mysqldudf_sys.so".to_string(),
            source: UdfkitError::query_failed("Access denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("lib_mysqldudf_sys.so"));
        assert!(msg.contains("Access denied"));

        let err = EscalationError::UnsupportedPlatform {
            os: "osx10.15".to_string(),
            machine: "x86_64".to_string(),
        };
        assert!(err.to_string().contains("osx10.15"));
    }

    #[test]
    fn test_escalation_error_conversion() {
        let err: UdfkitError = EscalationError::Artifact(UdfkitError::artifact_error("not hex")).into();
        assert_eq!(err.error_code(), "ARTIFACT_ERROR");

        let err: UdfkitError =
            EscalationError::PluginDirQuery(UdfkitError::connection_failed("reset")).into();
        assert_eq!(err.error_code(), "CONNECTION_FAILED");

        let err: UdfkitError = EscalationError::MissingPluginDir.into();
        assert_eq!(err.error_code(), "ENGINE_ERROR");
        assert!(err.message().contains("plugin directory"));
    }
}
