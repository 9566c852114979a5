//! # User-code faults
//!
//! A [`Fault`] is what the engine captures when code it does not own fails:
//! component activate/deactivate/bind/unbind methods, implementation
//! constructors supplied by a module, and event listener callbacks.
//!
//! Faults come in two flavours. Callbacks may return `Err(Fault)` directly,
//! and any panic unwinding out of a callback is converted into a fault of
//! kind [`FaultKind::Panic`] by [`capture`].
//!
//! Two kinds are special. [`FaultKind::LibraryLoad`] and
//! [`FaultKind::Security`] are raised by the module loader collaborator and
//! select the containment path during activation; every other kind is
//! logged and swallowed.
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Classification of a captured fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// A module's implementation library or symbol could not be loaded.
    LibraryLoad,
    /// A module failed security or validation checks.
    Security,
    /// An error returned by user code.
    Runtime,
    /// A panic unwound out of user code.
    Panic,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::LibraryLoad => write!(f, "library-load"),
            FaultKind::Security => write!(f, "security"),
            FaultKind::Runtime => write!(f, "runtime"),
            FaultKind::Panic => write!(f, "panic"),
        }
    }
}

/// A fault captured from user code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} fault: {message}")]
pub struct Fault {
    kind: FaultKind,
    message: String,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn library_load(message: impl Into<String>) -> Self {
        Self::new(FaultKind::LibraryLoad, message)
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Security, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Runtime, message)
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Load and security faults propagate out of activation; all others are contained.
    pub fn is_propagated(&self) -> bool {
        matches!(self.kind, FaultKind::LibraryLoad | FaultKind::Security)
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Self::new(FaultKind::Panic, message)
    }
}

/// Run user code, converting an unwinding panic into a [`Fault`].
///
/// Locks held by the caller stay held and unpoisoned; the closure never
/// unwinds past this frame.
pub fn capture<T, F>(f: F) -> Result<T, Fault>
where
    F: FnOnce() -> Result<T, Fault>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Fault::from_panic(payload)),
    }
}
