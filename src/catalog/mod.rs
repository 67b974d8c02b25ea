//! Session Catalog
//!
//! Durable store of [`SessionRecord`]s backed by a single `SQLite` file.
//!
//! # Storage Layout
//! One table named `data`, one row per record. Every column except the
//! identifier is text, so flags are stored as `"true"`/`"false"` and numbers
//! as their decimal text. The `connect_type` column is written for external
//! readers but ignored on load: the label is always re-derived from the flags.
//!
//! # Implementation Notes
//! - Uses `rusqlite` (synchronous driver, no async needed)
//! - The file, its parent directory and the schema are created on first use
//! - Every write is its own implicit transaction (committed immediately)
//! - `update` never touches `add_time`

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::Path;

use crate::engine::DatabaseKind;
use crate::error::{Result, UdfkitError};
use crate::session::{
    parse_timestamp, ProxySettings, SessionRecord, Transport, TunnelSettings, DEFAULT_TIMEOUT_SECS,
};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    database_type TEXT NOT NULL,
    ip_address TEXT NOT NULL,
    port TEXT NOT NULL,
    username TEXT,
    password TEXT,
    database TEXT,
    timeout TEXT DEFAULT '60',
    memo TEXT,
    is_http TEXT DEFAULT 'false',
    url TEXT,
    encryption_key TEXT,
    is_proxy TEXT DEFAULT 'false',
    proxy_type TEXT,
    proxy_address TEXT,
    proxy_port TEXT,
    proxy_username TEXT,
    proxy_password TEXT,
    http_headers TEXT,
    connect_type TEXT,
    add_time TEXT
)";

const SELECT_COLUMNS: &str = "SELECT id, database_type, ip_address, port, username, password, \
     database, timeout, memo, is_http, url, encryption_key, is_proxy, proxy_type, \
     proxy_address, proxy_port, proxy_username, proxy_password, http_headers, add_time \
     FROM data";

/// Session catalog backed by `SQLite`
pub struct SessionCatalog {
    conn: Connection,
}

impl SessionCatalog {
    /// Open the catalog at `path`, creating the file and schema if absent
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    UdfkitError::catalog_error(format!(
                        "Could not create catalog directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| {
            UdfkitError::catalog_error(format!("Failed to open catalog {}: {e}", path.display()))
        })?;

        Self::with_connection(conn)
    }

    /// Open a throwaway catalog that lives only in memory
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| UdfkitError::catalog_error(format!("Failed to open in-memory catalog: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| UdfkitError::catalog_error(format!("Failed to create catalog schema: {e}")))?;
        Ok(Self { conn })
    }

    /// All records ordered by identifier
    ///
    /// Rows that cannot be turned into a record (unknown database type) are
    /// skipped with a warning so one bad row never hides the rest.
    pub fn list(&self) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let raw_rows = stmt
            .query_map([], RawRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(raw_rows
            .into_iter()
            .filter_map(|raw| match raw.into_record() {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping catalog row: {e}");
                    None
                }
            })
            .collect())
    }

    /// Find a record by identifier
    pub fn find(&self, id: i64) -> Result<Option<SessionRecord>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], RawRow::from_row)?;

        match rows.next() {
            Some(raw) => raw?.into_record().map(Some),
            None => Ok(None),
        }
    }

    /// Insert a record and return its assigned identifier
    ///
    /// Any identifier already set on `record` is ignored.
    pub fn add(&self, record: &SessionRecord) -> Result<i64> {
        let row = FlatRecord::from(record);
        self.conn.execute(
            "INSERT INTO data (
                database_type, ip_address, port, username, password, database,
                timeout, memo, is_http, url, encryption_key, is_proxy,
                proxy_type, proxy_address, proxy_port, proxy_username,
                proxy_password, http_headers, connect_type, add_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            params![
                row.database_type,
                row.ip_address,
                row.port,
                row.username,
                row.password,
                row.database,
                row.timeout,
                row.memo,
                row.is_http,
                row.url,
                row.encryption_key,
                row.is_proxy,
                row.proxy_type,
                row.proxy_address,
                row.proxy_port,
                row.proxy_username,
                row.proxy_password,
                row.http_headers,
                row.connect_type,
                row.add_time,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Replace every field of an existing record except its creation time
    ///
    /// Returns the number of rows affected (0 when the id is unknown).
    pub fn update(&self, record: &SessionRecord) -> Result<usize> {
        let id = record
            .id
            .ok_or_else(|| UdfkitError::invalid_input("Cannot update a session record without an id"))?;

        let row = FlatRecord::from(record);
        let affected = self.conn.execute(
            "UPDATE data SET
                database_type = ?1, ip_address = ?2, port = ?3, username = ?4,
                password = ?5, database = ?6, timeout = ?7, memo = ?8,
                is_http = ?9, url = ?10, encryption_key = ?11, is_proxy = ?12,
                proxy_type = ?13, proxy_address = ?14, proxy_port = ?15,
                proxy_username = ?16, proxy_password = ?17, http_headers = ?18,
                connect_type = ?19
            WHERE id = ?20",
            params![
                row.database_type,
                row.ip_address,
                row.port,
                row.username,
                row.password,
                row.database,
                row.timeout,
                row.memo,
                row.is_http,
                row.url,
                row.encryption_key,
                row.is_proxy,
                row.proxy_type,
                row.proxy_address,
                row.proxy_port,
                row.proxy_username,
                row.proxy_password,
                row.http_headers,
                row.connect_type,
                id,
            ],
        )?;

        Ok(affected)
    }

    /// Delete a record; returns the number of rows affected
    pub fn delete(&self, id: i64) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM data WHERE id = ?1", params![id])?)
    }
}

/// Record flattened into catalog columns
struct FlatRecord {
    database_type: &'static str,
    ip_address: String,
    port: String,
    username: String,
    password: String,
    database: String,
    timeout: String,
    memo: String,
    is_http: &'static str,
    url: String,
    encryption_key: String,
    is_proxy: &'static str,
    proxy_type: String,
    proxy_address: String,
    proxy_port: String,
    proxy_username: String,
    proxy_password: String,
    http_headers: String,
    connect_type: &'static str,
    add_time: String,
}

impl From<&SessionRecord> for FlatRecord {
    fn from(record: &SessionRecord) -> Self {
        let (tunnel, proxy) = match &record.transport {
            Transport::Direct => (None, None),
            Transport::HttpTunnel(tunnel) => (Some(tunnel), tunnel.proxy.as_ref()),
        };

        Self {
            database_type: record.kind.catalog_label(),
            ip_address: record.host.clone(),
            port: record.port.to_string(),
            username: record.username.clone(),
            password: record.password.clone(),
            database: record.database.clone(),
            timeout: record.timeout_secs.to_string(),
            memo: record.memo.clone(),
            is_http: flag_text(tunnel.is_some()),
            url: tunnel.map(|t| t.url.clone()).unwrap_or_default(),
            encryption_key: tunnel.map(|t| t.encryption_key.clone()).unwrap_or_default(),
            is_proxy: flag_text(proxy.is_some()),
            proxy_type: proxy.map(|p| p.kind.clone()).unwrap_or_default(),
            proxy_address: proxy.map(|p| p.address.clone()).unwrap_or_default(),
            proxy_port: proxy.map(|p| p.port.clone()).unwrap_or_default(),
            proxy_username: proxy.map(|p| p.username.clone()).unwrap_or_default(),
            proxy_password: proxy.map(|p| p.password.clone()).unwrap_or_default(),
            http_headers: tunnel.map(|t| t.headers.clone()).unwrap_or_default(),
            connect_type: record.connect_type(),
            add_time: record.created_at_text(),
        }
    }
}

const fn flag_text(flag: bool) -> &'static str {
    if flag {
        "true"
    } else {
        "false"
    }
}

/// Anything but `false` (or nothing) counts as set
fn parse_flag(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && !text.eq_ignore_ascii_case("false")
}

/// Row as read from the catalog, before validation
struct RawRow {
    id: i64,
    database_type: String,
    ip_address: String,
    port: String,
    username: String,
    password: String,
    database: String,
    timeout: String,
    memo: String,
    is_http: String,
    url: String,
    encryption_key: String,
    is_proxy: String,
    proxy_type: String,
    proxy_address: String,
    proxy_port: String,
    proxy_username: String,
    proxy_password: String,
    http_headers: String,
    add_time: String,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        // Nullable text columns read as empty strings
        let text = |idx: usize| -> rusqlite::Result<String> {
            Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
        };

        Ok(Self {
            id: row.get(0)?,
            database_type: text(1)?,
            ip_address: text(2)?,
            port: text(3)?,
            username: text(4)?,
            password: text(5)?,
            database: text(6)?,
            timeout: text(7)?,
            memo: text(8)?,
            is_http: text(9)?,
            url: text(10)?,
            encryption_key: text(11)?,
            is_proxy: text(12)?,
            proxy_type: text(13)?,
            proxy_address: text(14)?,
            proxy_port: text(15)?,
            proxy_username: text(16)?,
            proxy_password: text(17)?,
            http_headers: text(18)?,
            add_time: text(19)?,
        })
    }

    fn into_record(self) -> Result<SessionRecord> {
        let id = self.id;
        let kind = DatabaseKind::from_catalog_label(&self.database_type).ok_or_else(|| {
            UdfkitError::catalog_error(format!(
                "Session {id} has unknown database type '{}'",
                self.database_type
            ))
        })?;

        let port = match self.port.trim().parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => {
                tracing::warn!(id, port = %self.port, "Unreadable port in catalog, using the default");
                kind.default_port()
            }
        };

        let timeout_secs = match self.timeout.trim() {
            "" => DEFAULT_TIMEOUT_SECS,
            text => text.parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(id, timeout = %self.timeout, "Unreadable timeout in catalog, using the default");
                DEFAULT_TIMEOUT_SECS
            }),
        };

        let created_at = parse_timestamp(self.add_time.trim()).unwrap_or_else(|| {
            tracing::warn!(id, add_time = %self.add_time, "Unreadable add_time in catalog");
            NaiveDateTime::default()
        });

        let transport = if parse_flag(&self.is_http) {
            let proxy = parse_flag(&self.is_proxy).then(|| ProxySettings {
                kind: self.proxy_type,
                address: self.proxy_address,
                port: self.proxy_port,
                username: self.proxy_username,
                password: self.proxy_password,
            });
            Transport::HttpTunnel(TunnelSettings {
                url: self.url,
                encryption_key: self.encryption_key,
                headers: self.http_headers,
                proxy,
            })
        } else {
            Transport::Direct
        };

        Ok(SessionRecord {
            id: Some(id),
            kind,
            host: self.ip_address,
            port,
            username: self.username,
            password: self.password,
            database: self.database,
            timeout_secs,
            memo: self.memo,
            transport,
            created_at,
        })
    }
}
