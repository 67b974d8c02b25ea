//! udfkit CLI Entry Point
//!
//! Subcommands:
//! - `session` - manage the session catalog (list, show, add, update, delete)
//! - `test` / `info` - check a saved session and fingerprint its server
//! - `escalate` / `exec` / `clean` - the UDF workflow against a MySQL session
//! - `sql` - run an arbitrary statement
//! - `config` - show or change settings
//!
//! All output to stdout is one JSON envelope per command. Logs go to stderr.

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use udfkit::config::{self, ConfigLocation, Settings, SettingsFile};
use udfkit::{
    ArtifactStore, DatabaseKind, ErrorEnvelope, FanoutSink, LogEvent, MemorySink, Metadata, OutputEncoding,
    Result, SessionCatalog, SessionDriver, SessionRecord, SharedSink, SqlPayload,
    SuccessEnvelope, TracingSink, Transport, TunnelSettings, UdfkitError,
};

/// udfkit - session catalog and MySQL UDF workflow toolkit
#[derive(Parser)]
#[command(name = "udfkit")]
#[command(about = "Saved database sessions and the MySQL UDF workflow for authorized assessments")]
#[command(version)]
struct Cli {
    /// Session catalog file (overrides config)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Directory holding the hex payload files (overrides config)
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage saved sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Connect and run a trivial query
    Test { id: i64 },

    /// Fingerprint the server (version, compiled OS and machine)
    Info { id: i64 },

    /// Upload and register the command-execution function
    Escalate { id: i64 },

    /// Run an operating-system command through the registered function
    Exec {
        id: i64,

        /// Output encoding: utf-8, gb2312 or gbk
        #[arg(long)]
        encoding: Option<OutputEncoding>,

        command: String,
    },

    /// Drop every function escalation may have registered
    Clean { id: i64 },

    /// Run an arbitrary SQL statement
    Sql { id: i64, statement: String },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved settings
    Show,

    /// Write settings to the local (default) or global config file
    Set {
        /// Write `~/.config/udfkit/config.json` instead of `.udfkit/config.json`
        #[arg(long)]
        global: bool,

        #[arg(long)]
        catalog_path: Option<PathBuf>,

        #[arg(long)]
        artifact_dir: Option<PathBuf>,

        #[arg(long)]
        encoding: Option<OutputEncoding>,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List all sessions
    List,

    /// Show one session (secrets redacted)
    Show { id: i64 },

    /// Add a session
    Add(SessionFields),

    /// Update fields of a session
    Update {
        id: i64,

        #[command(flatten)]
        fields: SessionFields,
    },

    /// Delete a session
    Delete { id: i64 },
}

/// Session fields; every flag is optional so the same set serves add and update
#[derive(Args, Default)]
struct SessionFields {
    /// Database kind: mysql, mssql or postgresql
    #[arg(long)]
    kind: Option<DatabaseKind>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    user: Option<String>,

    /// Prompted for on `add` when omitted
    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    database: Option<String>,

    /// Connect timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    memo: Option<String>,

    /// Switch the session to a direct connection
    #[arg(long, conflicts_with = "tunnel_url")]
    direct: bool,

    /// HTTP tunnel URL
    #[arg(long)]
    tunnel_url: Option<String>,

    #[arg(long)]
    tunnel_key: Option<String>,

    /// Extra HTTP headers sent to the tunnel
    #[arg(long)]
    tunnel_headers: Option<String>,

    /// Proxy in front of the tunnel, e.g. socks5
    #[arg(long)]
    proxy_type: Option<String>,

    #[arg(long)]
    proxy_address: Option<String>,

    #[arg(long)]
    proxy_port: Option<String>,

    #[arg(long)]
    proxy_user: Option<String>,

    #[arg(long)]
    proxy_password: Option<String>,
}

impl SessionFields {
    /// Overlay the given flags on `record`
    ///
    /// Tunnel and proxy flags that would have nowhere to go are rejected.
    fn apply(self, mut record: SessionRecord) -> Result<SessionRecord> {
        let has_proxy_details = self.proxy_type.is_some()
            || self.proxy_port.is_some()
            || self.proxy_user.is_some()
            || self.proxy_password.is_some();
        let has_tunnel_details = self.tunnel_key.is_some()
            || self.tunnel_headers.is_some()
            || self.proxy_address.is_some()
            || has_proxy_details;

        if let Some(kind) = self.kind {
            if self.port.is_none() && record.port == record.kind.default_port() {
                record.port = kind.default_port();
            }
            record.kind = kind;
        }
        if let Some(host) = self.host {
            record.host = host;
        }
        if let Some(port) = self.port {
            record.port = port;
        }
        if let Some(user) = self.user {
            record.username = user;
        }
        if let Some(password) = self.password {
            record.password = password;
        }
        if let Some(database) = self.database {
            record.database = database;
        }
        if let Some(timeout) = self.timeout {
            record.timeout_secs = timeout;
        }
        if let Some(memo) = self.memo {
            record.memo = memo;
        }

        if self.direct {
            record.transport = Transport::Direct;
        }

        let wants_tunnel = self.tunnel_url.is_some() || record.transport.is_http();
        if wants_tunnel {
            let mut tunnel = match record.transport {
                Transport::HttpTunnel(tunnel) => tunnel,
                Transport::Direct => TunnelSettings::default(),
            };
            if let Some(url) = self.tunnel_url {
                tunnel.url = url;
            }
            if let Some(key) = self.tunnel_key {
                tunnel.encryption_key = key;
            }
            if let Some(headers) = self.tunnel_headers {
                tunnel.headers = headers;
            }
            if self.proxy_address.is_none() && tunnel.proxy.is_none() && has_proxy_details {
                return Err(UdfkitError::invalid_input(
                    "--proxy-type, --proxy-port, --proxy-user and --proxy-password need --proxy-address",
                ));
            }
            if self.proxy_address.is_some() || tunnel.proxy.is_some() {
                let mut proxy = tunnel.proxy.take().unwrap_or_default();
                if let Some(kind) = self.proxy_type {
                    proxy.kind = kind;
                }
                if let Some(address) = self.proxy_address {
                    proxy.address = address;
                }
                if let Some(port) = self.proxy_port {
                    proxy.port = port;
                }
                if let Some(user) = self.proxy_user {
                    proxy.username = user;
                }
                if let Some(password) = self.proxy_password {
                    proxy.password = password;
                }
                tunnel.proxy = Some(proxy);
            }
            record.transport = Transport::HttpTunnel(tunnel);
        } else if has_tunnel_details {
            return Err(UdfkitError::invalid_input(
                "Tunnel and proxy options need an HTTP tunnel, pass --tunnel-url",
            ));
        }

        Ok(record)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let name = command_name(&cli.command);
    let started = Instant::now();

    let overrides = SettingsFile {
        catalog_path: cli.catalog,
        artifact_dir: cli.artifacts,
        default_encoding: None,
    };
    let settings = match config::load_with_precedence().and_then(|files| config::resolve_settings(files, overrides)) {
        Ok(settings) => settings,
        Err(e) => return print_error("", name, &e),
    };
    tracing::debug!(catalog = %settings.catalog_path.display(), artifacts = %settings.artifact_dir.display(), "Settings resolved");

    let outcome = match cli.command {
        Commands::Session { action } => run_session_action(&settings, action)
            .map(|(data, rows)| {
                let meta = Metadata::new(elapsed_ms(started));
                let meta = match rows {
                    Some(rows) => meta.with_rows(rows),
                    None => meta,
                };
                (String::new(), data, meta)
            })
            .map_err(CommandFailure::from),
        Commands::Config { action } => run_config_action(&settings, action)
            .map(|data| (String::new(), data, Metadata::new(elapsed_ms(started))))
            .map_err(CommandFailure::from),
        command => run_workflow(&settings, command, started).await,
    };

    match outcome {
        Ok((engine, data, meta)) => {
            let envelope = SuccessEnvelope::new(engine, name, data, meta);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            let envelope = failure.into_envelope(name);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// A failed command plus whatever its session logged before failing
struct CommandFailure {
    engine: String,
    error: UdfkitError,
    events: Vec<LogEvent>,
}

impl CommandFailure {
    fn into_envelope(self, command: &str) -> ErrorEnvelope {
        ErrorEnvelope::from_error(self.engine, command, &self.error).with_events(&self.events)
    }
}

impl From<UdfkitError> for CommandFailure {
    fn from(error: UdfkitError) -> Self {
        Self { engine: String::new(), error, events: Vec::new() }
    }
}

/// Initialize the logging system (stderr, `RUST_LOG` wins when set)
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("udfkit=debug")
        } else {
            EnvFilter::new("udfkit=info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn print_error(engine: &str, command: &str, err: &UdfkitError) -> anyhow::Result<ExitCode> {
    let envelope = ErrorEnvelope::from_error(engine, command, err);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(ExitCode::FAILURE)
}

const fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Session { action } => match action {
            SessionAction::List => "session list",
            SessionAction::Show { .. } => "session show",
            SessionAction::Add(_) => "session add",
            SessionAction::Update { .. } => "session update",
            SessionAction::Delete { .. } => "session delete",
        },
        Commands::Test { .. } => "test",
        Commands::Info { .. } => "info",
        Commands::Escalate { .. } => "escalate",
        Commands::Exec { .. } => "exec",
        Commands::Clean { .. } => "clean",
        Commands::Sql { .. } => "sql",
        Commands::Config { action: ConfigAction::Show } => "config show",
        Commands::Config { action: ConfigAction::Set { .. } } => "config set",
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn find_session(catalog: &SessionCatalog, id: i64) -> Result<SessionRecord> {
    catalog
        .find(id)?
        .ok_or_else(|| UdfkitError::invalid_input(format!("Session {id} not found")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| UdfkitError::invalid_input(format!("Could not serialize output: {e}")))
}

/// Catalog maintenance; returns the data plus a row count for listings
fn run_session_action(settings: &Settings, action: SessionAction) -> Result<(serde_json::Value, Option<usize>)> {
    let catalog = SessionCatalog::open(&settings.catalog_path)?;

    match action {
        SessionAction::List => {
            let records: Vec<SessionRecord> = catalog.list()?.iter().map(SessionRecord::redacted).collect();
            let count = records.len();
            Ok((to_json(&records)?, Some(count)))
        }
        SessionAction::Show { id } => Ok((to_json(&find_session(&catalog, id)?.redacted())?, None)),
        SessionAction::Add(mut fields) => {
            let kind = fields.kind.unwrap_or(DatabaseKind::Mysql);
            if fields.host.as_deref().map_or(true, str::is_empty) {
                return Err(UdfkitError::invalid_input("--host is required"));
            }
            if fields.password.is_none() {
                fields.password = Some(prompt_password()?);
            }

            let template = SessionRecord::new(kind, "", kind.default_port(), "", "");
            let record = fields.apply(template)?;
            let id = catalog.add(&record)?;
            tracing::info!(id, address = %record.address(), "Session added");
            Ok((json!({ "id": id }), None))
        }
        SessionAction::Update { id, fields } => {
            let record = fields.apply(find_session(&catalog, id)?)?;
            let updated = catalog.update(&record)?;
            Ok((json!({ "id": id, "updated": updated }), None))
        }
        SessionAction::Delete { id } => {
            let deleted = catalog.delete(id)?;
            if deleted == 0 {
                return Err(UdfkitError::invalid_input(format!("Session {id} not found")));
            }
            Ok((json!({ "id": id, "deleted": deleted }), None))
        }
    }
}

/// Show resolved settings, or merge new values into one config file
fn run_config_action(settings: &Settings, action: ConfigAction) -> Result<serde_json::Value> {
    match action {
        ConfigAction::Show => to_json(settings),
        ConfigAction::Set { global, catalog_path, artifact_dir, encoding } => {
            let location = if global { ConfigLocation::Global } else { ConfigLocation::Local };
            let path = config::config_path(location)?;
            let update = SettingsFile { catalog_path, artifact_dir, default_encoding: encoding };
            let merged = config::load_settings(&path)?.merged_with(update);
            config::save_settings(&path, &merged)?;
            tracing::info!(path = %path.display(), "Settings saved");
            Ok(json!({ "path": path.display().to_string(), "settings": to_json(&merged)? }))
        }
    }
}

fn prompt_password() -> Result<String> {
    dialoguer::Password::new()
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| UdfkitError::invalid_input(format!("Could not read password: {e}")))
}

/// Session-scoped commands: open a driver, run, close, attach the collected events
async fn run_workflow(
    settings: &Settings,
    command: Commands,
    started: Instant,
) -> std::result::Result<(String, serde_json::Value, Metadata), CommandFailure> {
    let id = match &command {
        Commands::Test { id }
        | Commands::Info { id }
        | Commands::Escalate { id }
        | Commands::Exec { id, .. }
        | Commands::Clean { id }
        | Commands::Sql { id, .. } => *id,
        Commands::Session { .. } | Commands::Config { .. } => {
            return Err(UdfkitError::invalid_input("command does not open a connection").into());
        }
    };

    let record = find_session(&SessionCatalog::open(&settings.catalog_path)?, id)?;
    let engine = record.kind.to_string();

    let memory = Arc::new(MemorySink::new());
    let tracing_sink: SharedSink = Arc::new(TracingSink);
    let collected: SharedSink = Arc::clone(&memory) as SharedSink;
    let sink: SharedSink = Arc::new(FanoutSink::new(vec![tracing_sink, collected]));

    let mut driver = SessionDriver::new(record, sink);
    let data = run_on_driver(&mut driver, settings, command).await;
    driver.close().await;

    let (data, rows) = match data {
        Ok(data) => data,
        Err(error) => return Err(CommandFailure { engine, error, events: memory.events() }),
    };
    let mut meta = Metadata::new(elapsed_ms(started)).with_events(&memory.events());
    if let Some(rows) = rows {
        meta = meta.with_rows(rows);
    }
    Ok((engine, data, meta))
}

async fn run_on_driver(
    driver: &mut SessionDriver,
    settings: &Settings,
    command: Commands,
) -> Result<(serde_json::Value, Option<usize>)> {
    match command {
        Commands::Test { .. } => {
            let connected = driver.test().await;
            Ok((json!({ "connected": connected }), None))
        }
        Commands::Info { .. } => {
            let fingerprint = driver.fingerprint().await;
            let mut data = to_json(&fingerprint)?;
            if let (Some(flavor), Some(object)) = (fingerprint.flavor(), data.as_object_mut()) {
                object.insert("flavor".to_string(), json!(flavor));
            }
            Ok((data, None))
        }
        Commands::Escalate { .. } => {
            let artifacts = ArtifactStore::new(&settings.artifact_dir);
            if let SessionDriver::MySql(handle) = &mut *driver {
                let report = handle.try_escalate(&artifacts).await?;
                return Ok((to_json(&report)?, None));
            }
            driver.escalate(&artifacts).await;
            Err(UdfkitError::not_supported(driver.kind().as_str(), "escalate"))
        }
        Commands::Exec { command, encoding, .. } => {
            let encoding = encoding.unwrap_or(settings.default_encoding);
            let output = driver.execute_command(&command, encoding).await;
            Ok((json!({ "command": command, "encoding": encoding.as_str(), "output": output }), None))
        }
        Commands::Clean { .. } => {
            driver.clean().await;
            Ok((json!({ "cleaned": driver.supports(udfkit::Capability::Clean) }), None))
        }
        Commands::Sql { statement, .. } => {
            let outcome = driver.execute_sql(&statement).await;
            let rows = match &outcome.payload {
                SqlPayload::Rows(rows) => Some(rows.len()),
                SqlPayload::Message(_) => None,
            };
            if !outcome.ok {
                if let SqlPayload::Message(message) = outcome.payload {
                    return Err(UdfkitError::query_failed(message));
                }
            }
            Ok((to_json(&outcome)?, rows))
        }
        Commands::Session { .. } | Commands::Config { .. } => {
            Err(UdfkitError::invalid_input("command does not open a connection"))
        }
    }
}
