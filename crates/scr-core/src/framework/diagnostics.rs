//! # Diagnostics sink
//!
//! Structured diagnostics emitted by the engine: a severity, a message and
//! optionally the [`Fault`] that caused it. The default [`LogSink`] forwards
//! records to the `log` facade; [`MemorySink`] keeps them for inspection.
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::framework::fault::Fault;
use crate::utils::sync::lock;

/// Log target used by [`LogSink`].
pub const LOG_TARGET: &str = "scr";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    /// Recoverable condition, such as a transient state race.
    Warning,
    /// A contained fault.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "DEBUG"),
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Receiver of engine diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>);
}

/// Shared handle to a diagnostics sink.
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Forwards diagnostics to the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>) {
        let level = match severity {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        };
        match fault {
            Some(fault) => log::log!(target: LOG_TARGET, level, "{} ({})", message, fault),
            None => log::log!(target: LOG_TARGET, level, "{}", message),
        }
    }
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    pub message: String,
    pub fault: Option<Fault>,
}

/// Records every diagnostic in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        lock(&self.records).clone()
    }

    /// Records whose message contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<DiagnosticRecord> {
        lock(&self.records)
            .iter()
            .filter(|record| record.message.contains(needle))
            .cloned()
            .collect()
    }

    pub fn count_at(&self, severity: Severity) -> usize {
        lock(&self.records).iter().filter(|r| r.severity == severity).count()
    }

    pub fn clear(&self) {
        lock(&self.records).clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>) {
        lock(&self.records).push(DiagnosticRecord {
            severity,
            message: message.to_string(),
            fault: fault.cloned(),
        });
    }
}

/// Sink wrapper that drops DEBUG/INFO records unless logging is enabled.
pub(crate) struct GatedSink {
    inner: SharedSink,
    verbose: bool,
}

impl GatedSink {
    pub(crate) fn new(inner: SharedSink, verbose: bool) -> Self {
        Self { inner, verbose }
    }
}

impl DiagnosticSink for GatedSink {
    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>) {
        if self.verbose || severity >= Severity::Warning {
            self.inner.log(severity, message, fault);
        }
    }
}
