//! Scripted SQL channel for unit tests

use mysql_async::Value;

use crate::engine::{ResultSet, SqlChannel};
use crate::error::{Result, UdfkitError};

/// Canned reply to a statement
#[derive(Debug, Clone)]
pub(crate) enum Response {
    Rows(ResultSet),
    Affected(u64),
    Fail(String),
    Disconnected,
}

/// Channel that answers statements by prefix and records everything it saw
#[derive(Debug, Default)]
pub(crate) struct ScriptedChannel {
    pub statements: Vec<String>,
    script: Vec<(String, Response)>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `response` to statements starting with `prefix`; first match wins
    pub fn on(mut self, prefix: &str, response: Response) -> Self {
        self.script.push((prefix.to_string(), response));
        self
    }

    fn respond(&mut self, sql: &str) -> Response {
        self.statements.push(sql.to_string());
        self.script
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Response::Fail(format!("unscripted statement: {sql}")))
    }
}

impl SqlChannel for ScriptedChannel {
    async fn query(&mut self, sql: &str) -> Result<ResultSet> {
        match self.respond(sql) {
            Response::Rows(result) => Ok(result),
            Response::Affected(_) => Ok(ResultSet::default()),
            Response::Fail(message) => Err(UdfkitError::query_failed(message)),
            Response::Disconnected => Err(UdfkitError::connection_failed("Connection refused")),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        match self.respond(sql) {
            Response::Rows(result) => Ok(result.rows.len() as u64),
            Response::Affected(count) => Ok(count),
            Response::Fail(message) => Err(UdfkitError::query_failed(message)),
            Response::Disconnected => Err(UdfkitError::connection_failed("Connection refused")),
        }
    }
}

/// Build a text result set
pub(crate) fn rows(columns: &[&str], data: &[&[&str]]) -> ResultSet {
    ResultSet {
        columns: columns.iter().map(|c| (*c).to_string()).collect(),
        rows: data
            .iter()
            .map(|row| row.iter().map(|v| Value::Bytes(v.as_bytes().to_vec())).collect())
            .collect(),
    }
}
