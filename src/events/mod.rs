//! Structured Log Events
//!
//! Every component reports progress and failures as `(timestamp, level, message)`
//! events delivered to a caller-supplied [`EventSink`]. The library never holds
//! global log state: a handle carries the sink it was connected with.
//!
//! # Provided Sinks
//! - [`TracingSink`] - forwards events to `tracing` (used by the CLI)
//! - [`MemorySink`] - collects events in memory (tests, JSON output)
//! - [`ChannelSink`] - pushes events into a tokio channel (interactive frontends)
//! - [`FanoutSink`] - delivers each event to several sinks

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single log event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Local wall-clock time the event was produced
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEvent {
    /// Create an event stamped with the current time
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self { timestamp: Local::now(), level, message: message.into() }
    }
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%Y-%m-%d %H:%M:%S"), self.message)
    }
}

/// Receiver of log events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LogEvent);

    fn debug(&self, message: &str) {
        self.emit(LogEvent::now(LogLevel::Debug, message));
    }

    fn info(&self, message: &str) {
        self.emit(LogEvent::now(LogLevel::Info, message));
    }

    fn warn(&self, message: &str) {
        self.emit(LogEvent::now(LogLevel::Warn, message));
    }

    fn error(&self, message: &str) {
        self.emit(LogEvent::now(LogLevel::Error, message));
    }
}

/// Shared sink handle threaded through connections
pub type SharedSink = Arc<dyn EventSink>;

/// Forwards events to the `tracing` macros
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        match event.level {
            LogLevel::Debug => tracing::debug!(at = %event.timestamp, "{}", event.message),
            LogLevel::Info => tracing::info!(at = %event.timestamp, "{}", event.message),
            LogLevel::Warn => tracing::warn!(at = %event.timestamp, "{}", event.message),
            LogLevel::Error => tracing::error!(at = %event.timestamp, "{}", event.message),
        }
    }
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Messages only, in emission order
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.message).collect()
    }

    /// True if any recorded message contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|event| event.message.contains(needle))
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Pushes events into an unbounded tokio channel
///
/// Events emitted after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LogEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: LogEvent) {
        let _ = self.tx.send(event);
    }
}

/// Delivers every event to each wrapped sink in order
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<SharedSink>,
}

impl FanoutSink {
    #[must_use]
    pub fn new(sinks: Vec<SharedSink>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: LogEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}
