//! Driver Capabilities
//!
//! The set of database kinds is closed, but only MySQL has a working driver.
//! Instead of failing somewhere deep inside a driver, callers ask up front
//! whether a kind supports an operation and branch on the answer.
//!
//! Unsupported kinds still expose the full operation surface through
//! [`crate::engine::SessionDriver`]; every operation on them reports
//! "not supported" deterministically.

use serde::{Deserialize, Serialize};

use crate::engine::DatabaseKind;
use crate::error::{Result, UdfkitError};

/// Operations a session driver can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Connect,
    Test,
    Fingerprint,
    Escalate,
    Command,
    Clean,
    Sql,
}

impl Capability {
    /// Every capability, in workflow order
    pub const ALL: [Self; 7] = [
        Self::Connect,
        Self::Test,
        Self::Fingerprint,
        Self::Escalate,
        Self::Command,
        Self::Clean,
        Self::Sql,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Test => "test",
            Self::Fingerprint => "fingerprint",
            Self::Escalate => "escalate",
            Self::Command => "command",
            Self::Clean => "clean",
            Self::Sql => "sql",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `kind` has a driver implementing `capability`
#[must_use]
pub const fn supports(kind: DatabaseKind, capability: Capability) -> bool {
    match kind {
        DatabaseKind::Mysql => match capability {
            Capability::Connect
            | Capability::Test
            | Capability::Fingerprint
            | Capability::Escalate
            | Capability::Command
            | Capability::Clean
            | Capability::Sql => true,
        },
        DatabaseKind::Mssql | DatabaseKind::PostgreSql => false,
    }
}

/// Capabilities offered by `kind`
#[must_use]
pub fn capabilities(kind: DatabaseKind) -> Vec<Capability> {
    Capability::ALL.into_iter().filter(|cap| supports(kind, *cap)).collect()
}

/// Fail with `NotSupported` unless `kind` offers `capability`
pub fn require(kind: DatabaseKind, capability: Capability) -> Result<()> {
    if supports(kind, capability) {
        Ok(())
    } else {
        Err(UdfkitError::not_supported(kind.as_str(), capability.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_supports_everything() {
        assert_eq!(capabilities(DatabaseKind::Mysql), Capability::ALL.to_vec());
        for cap in Capability::ALL {
            assert!(require(DatabaseKind::Mysql, cap).is_ok());
        }
    }

    #[test]
    fn test_stub_kinds_support_nothing() {
        for kind in [DatabaseKind::Mssql, DatabaseKind::PostgreSql] {
            assert!(capabilities(kind).is_empty());
            for cap in Capability::ALL {
                let err = require(kind, cap).unwrap_err();
                assert_eq!(err.error_code(), "NOT_SUPPORTED");
                assert!(err.message().contains(cap.as_str()));
            }
        }
    }

    #[test]
    fn test_capability_serialization() {
        assert_eq!(serde_json::to_string(&Capability::Escalate).unwrap(), r#""escalate""#);
    }
}
