//! Generic SQL Execution
//!
//! Runs any statement and reports the result in-band. Row-returning statements
//! (by leading keyword) yield their rows and column names; everything else runs
//! as a mutation on the autocommit session and yields an affected-row count.

use super::mysql_value_to_json;
use crate::engine::{SqlChannel, SqlOutcome};
use crate::events::EventSink;
use crate::statement::{classify, StatementKind};

pub async fn execute_sql<C: SqlChannel>(channel: &mut C, sink: &dyn EventSink, sql: &str) -> SqlOutcome {
    let Some(kind) = classify(sql) else {
        return SqlOutcome::failed("Statement is empty");
    };

    let outcome = match kind {
        StatementKind::Query => channel.query(sql).await.map(|result| {
            let rows = result
                .rows
                .iter()
                .map(|row| row.iter().map(mysql_value_to_json).collect())
                .collect();
            SqlOutcome::rows(result.columns, rows)
        }),
        StatementKind::Mutation => channel.execute(sql).await.map(SqlOutcome::affected),
    };

    outcome.unwrap_or_else(|e| {
        sink.error(&format!("SQL execution failed: {e}"));
        SqlOutcome::failed(e.to_string())
    })
}
