//! # Framework
//!
//! The framework hosts installed modules, owns the service registry and the
//! event dispatcher, and drives the lifecycle that observers see as framework
//! and module events.
//!
//! ## Submodules
//!
//! - `bootstrap`: [`Framework`] and its lifecycle (`init`, `start`, `stop`,
//!   `wait_for_stop`).
//! - `module`: installed [`Module`]s, their descriptors and per-module
//!   service contexts.
//! - `config`: [`FrameworkConfig`], loadable from JSON, YAML or TOML.
//! - `diagnostics`: the [`DiagnosticSink`] contract used for engine diagnostics.
//! - `fault`: [`Fault`], the value captured from failing user code.
//! - `error`: framework, configuration and crate-wide error types.
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod fault;
pub mod module;

pub use bootstrap::{Framework, FrameworkState};
pub use config::{ConfigFormat, FrameworkConfig};
pub use diagnostics::{DiagnosticRecord, DiagnosticSink, LogSink, MemorySink, Severity, SharedSink};
pub use error::{ConfigError, Error, FrameworkError, Result};
pub use fault::{Fault, FaultKind};
pub use module::{Module, ModuleContext, ModuleDescriptor, ModuleId, ModuleInfo, ModuleState};
