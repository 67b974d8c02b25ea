//! Trace Cleanup
//!
//! Drops every function escalation may have registered, including names used
//! by older releases. Best effort: a failed drop does not stop the next one,
//! unless the connection itself is gone. Every outcome goes to the event sink
//! only.

use super::CLEANUP_FUNCTIONS;
use crate::engine::SqlChannel;
use crate::events::EventSink;

/// `DROP FUNCTION IF EXISTS <name>`
#[must_use]
pub fn drop_sql(function: &str) -> String {
    format!("DROP FUNCTION IF EXISTS {function}")
}

pub async fn clean<C: SqlChannel>(channel: &mut C, sink: &dyn EventSink) {
    sink.info("Cleaning traces");

    for function in CLEANUP_FUNCTIONS {
        match channel.execute(&drop_sql(function)).await {
            Ok(_) => sink.info(&format!("Dropped function {function}")),
            Err(e) => {
                sink.warn(&format!("Could not drop function {function}: {e}"));
                if e.is_connection_error() {
                    sink.warn("Server unreachable, skipping remaining drops");
                    break;
                }
            }
        }
    }

    sink.info("Trace cleanup finished");
}
