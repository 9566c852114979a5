use thiserror::Error;

use crate::framework::fault::Fault;

/// Errors from component management operations.
///
/// Faults raised by component code itself are reported as
/// [`Fault`](crate::framework::Fault)s, not through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("Invalid metadata for component '{component}': {reason}")]
    InvalidMetadata { component: String, reason: String },

    #[error("Component '{name}' is already registered for module {module}")]
    DuplicateComponent { module: u64, name: String },

    #[error("Component '{0}' not found")]
    UnknownComponent(String),

    #[error("Component '{0}' is not a factory component")]
    NotFactory(String),

    #[error("No configuration '{0}' exists")]
    UnknownConfiguration(String),

    #[error("Factory configuration '{0}' already exists")]
    DuplicateFactoryConfiguration(String),

    #[error("Component '{0}' is disabled")]
    Disabled(String),

    #[error("Worker for component '{component}' did not complete: {reason}")]
    TaskAborted { component: String, reason: String },
}

impl From<&ComponentError> for Fault {
    fn from(error: &ComponentError) -> Self {
        Fault::runtime(error.to_string())
    }
}
