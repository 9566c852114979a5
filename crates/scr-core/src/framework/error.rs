//! # Framework errors
//!
//! Defines [`FrameworkError`] for framework lifecycle and module operations,
//! [`ConfigError`] for loading [`FrameworkConfig`](crate::framework::config::FrameworkConfig),
//! and the crate-wide [`Error`] that aggregates every subsystem error.
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::component::error::ComponentError;
use crate::framework::bootstrap::FrameworkState;
use crate::framework::fault::Fault;
use crate::framework::module::{ModuleId, ModuleState};

/// Crate-wide error type.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Framework error: {0}")]
    Framework(#[from] FrameworkError),

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A fault from user code that the caller asked to see.
    #[error("Fault: {0}")]
    Fault(#[from] Fault),
}

/// Shorthand for Result with the crate error type
pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, ThisError)]
pub enum FrameworkError {
    #[error("Operation '{operation}' is not allowed while the framework is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: FrameworkState,
    },

    #[error("Module {0} is not installed")]
    ModuleNotFound(ModuleId),

    #[error("Module '{name}' is already installed as module {id}")]
    DuplicateModule { name: String, id: ModuleId },

    #[error("Operation '{operation}' is not allowed while module '{module}' is {state:?}")]
    InvalidModuleState {
        operation: &'static str,
        module: String,
        state: ModuleState,
    },

    #[error("The framework has been dropped")]
    FrameworkGone,
}

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("I/O error while reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported configuration format for path: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Deserialization from '{format}' failed: {source}")]
    Deserialization {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}
