//! Session Records
//!
//! A session record is the persisted description of one target: address,
//! credentials and transport options. Pure data, no I/O.
//!
//! The transport is modelled so that the derived "connect type" label can never
//! disagree with the flags: a [`Transport::Direct`] record has no tunnel or proxy
//! fields at all, and a [`Transport::HttpTunnel`] record carries the tunnel
//! fields plus an optional proxy.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::engine::DatabaseKind;

/// Timestamp format used by the catalog (`YYYY-MM-DD HH:MM:SS`)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default connect timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Label for direct connections
pub const CONNECT_TYPE_DIRECT: &str = "Direct";

/// Label for HTTP-tunneled connections
pub const CONNECT_TYPE_HTTP: &str = "HTTP";

/// Proxy settings used in front of an HTTP tunnel (stored, not wired)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Proxy protocol name as entered by the operator (e.g. `HTTP`, `SOCKS5`)
    pub kind: String,
    pub address: String,
    pub port: String,
    pub username: String,
    /// WARNING: Sensitive data, do not log
    pub password: String,
}

/// HTTP tunnel settings (stored, not wired)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSettings {
    pub url: String,
    pub encryption_key: String,
    /// Extra request headers, one `Name: value` per line
    pub headers: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySettings>,
}

/// How the target is reached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Direct,
    #[serde(rename = "http")]
    HttpTunnel(TunnelSettings),
}

impl Transport {
    /// Human-readable connect type derived from the transport flag
    #[must_use]
    pub const fn connect_type(&self) -> &'static str {
        match self {
            Self::Direct => CONNECT_TYPE_DIRECT,
            Self::HttpTunnel(_) => CONNECT_TYPE_HTTP,
        }
    }

    #[must_use]
    pub const fn is_http(&self) -> bool {
        matches!(self, Self::HttpTunnel(_))
    }

    #[must_use]
    pub const fn is_proxy(&self) -> bool {
        matches!(self, Self::HttpTunnel(TunnelSettings { proxy: Some(_), .. }))
    }
}

/// Persisted description of a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Catalog identifier, `None` until the record is added
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub kind: DatabaseKind,

    pub host: String,

    pub port: u16,

    pub username: String,

    /// WARNING: Sensitive data, do not log or include in error messages
    pub password: String,

    /// Database selected after connecting (may be empty)
    pub database: String,

    /// Connect timeout in seconds
    pub timeout_secs: u64,

    pub memo: String,

    pub transport: Transport,

    /// Creation time, seconds precision
    pub created_at: NaiveDateTime,
}

impl SessionRecord {
    /// Create a direct-connection record stamped with the current time
    #[must_use]
    pub fn new(
        kind: DatabaseKind,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            kind,
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            database: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            memo: String::new(),
            transport: Transport::Direct,
            created_at: now_seconds(),
        }
    }

    /// Create a MySQL record on the default port
    #[must_use]
    pub fn mysql(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(DatabaseKind::Mysql, host, DatabaseKind::Mysql.default_port(), username, password)
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Derived connect-type label (`Direct` or `HTTP`)
    #[must_use]
    pub const fn connect_type(&self) -> &'static str {
        self.transport.connect_type()
    }

    /// `host:port`, used in log lines
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Creation time in catalog format
    #[must_use]
    pub fn created_at_text(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Copy of the record with secrets blanked, safe for display
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = "********".to_string();
        }
        if let Transport::HttpTunnel(tunnel) = &mut copy.transport {
            if !tunnel.encryption_key.is_empty() {
                tunnel.encryption_key = "********".to_string();
            }
            if let Some(proxy) = &mut tunnel.proxy {
                if !proxy.password.is_empty() {
                    proxy.password = "********".to_string();
                }
            }
        }
        copy
    }
}

/// Current local time truncated to whole seconds
#[must_use]
pub fn now_seconds() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Parse a catalog timestamp
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunnel(proxy: Option<ProxySettings>) -> Transport {
        Transport::HttpTunnel(TunnelSettings {
            url: "http://10.0.0.5/tunnel.php".to_string(),
            encryption_key: "k3y".to_string(),
            headers: "X-Forwarded-For: 127.0.0.1".to_string(),
            proxy,
        })
    }

    #[test]
    fn test_new_record_defaults() {
        let record = SessionRecord::mysql("10.0.0.5", "root", "toor");
        assert_eq!(record.id, None);
        assert_eq!(record.kind, DatabaseKind::Mysql);
        assert_eq!(record.port, 3306);
        assert_eq!(record.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(record.transport, Transport::Direct);
        assert_eq!(record.created_at.nanosecond(), 0);
        assert_eq!(record.address(), "10.0.0.5:3306");
    }

    #[test]
    fn test_connect_type_follows_transport() {
        let record = SessionRecord::mysql("h", "u", "p");
        assert_eq!(record.connect_type(), CONNECT_TYPE_DIRECT);
        assert!(!record.transport.is_http());
        assert!(!record.transport.is_proxy());

        let record = record.with_transport(tunnel(None));
        assert_eq!(record.connect_type(), CONNECT_TYPE_HTTP);
        assert!(record.transport.is_http());
        assert!(!record.transport.is_proxy());

        let record = record.with_transport(tunnel(Some(ProxySettings {
            kind: "SOCKS5".to_string(),
            address: "127.0.0.1".to_string(),
            port: "1080".to_string(),
            ..Default::default()
        })));
        assert!(record.transport.is_proxy());
        assert_eq!(record.connect_type(), CONNECT_TYPE_HTTP);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let record = SessionRecord::mysql("h", "u", "p");
        let text = record.created_at_text();
        assert_eq!(text.len(), "YYYY-MM-DD HH:MM:SS".len());
        assert_eq!(parse_timestamp(&text), Some(record.created_at));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let record = SessionRecord::mysql("h", "root", "s3cret").with_transport(tunnel(Some(
            ProxySettings { password: "pp".to_string(), ..Default::default() },
        )));
        let redacted = record.redacted();
        assert_eq!(redacted.password, "********");
        let Transport::HttpTunnel(tunnel) = &redacted.transport else {
            panic!("transport changed");
        };
        assert_eq!(tunnel.encryption_key, "********");
        assert_eq!(tunnel.proxy.as_ref().map(|p| p.password.as_str()), Some("********"));
        assert_eq!(redacted.username, "root");
    }

    #[test]
    fn test_transport_serialization() {
        let json = serde_json::to_value(Transport::Direct).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "direct"}));
        let json = serde_json::to_value(tunnel(None)).unwrap();
        assert_eq!(json["mode"], "http");
        assert_eq!(json["url"], "http://10.0.0.5/tunnel.php");
    }
}
