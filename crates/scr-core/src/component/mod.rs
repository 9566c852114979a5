//! # Declarative components
//!
//! Components are declared with [`ComponentMetadata`]: the services they
//! provide, the services they need ([`ReferenceMetadata`]) and their
//! properties. The runtime creates instances only when every mandatory
//! reference is satisfied, wires bound services into them, and rewires or
//! recycles them as the services they depend on come and go.
//!
//! - [`ServiceComponentRuntime`] watches modules and creates a
//!   [`ComponentManager`] per description.
//! - A [`ComponentManager`] owns the [`ComponentConfiguration`]s of one
//!   component: a singleton, or one per factory configuration.
//! - A [`ComponentConfiguration`] runs the state machine and owns the live
//!   [`ComponentInstance`] and its [`ComponentContext`].
//! - [`ReferenceManager`]s track the matching services of each reference.
pub mod configuration;
pub mod context;
pub mod error;
pub mod handle;
pub mod instance;
pub mod manager;
pub mod metadata;
pub mod reference;
pub mod registry;
pub mod runtime;

pub use configuration::{ActiveInstance, ComponentConfiguration, ComponentState, ConfigurationIdentity, ReferenceState};
pub use context::{BoundService, ComponentContext};
pub use error::ComponentError;
pub use handle::CompletionHandle;
pub use instance::{ComponentInstance, ImplementationFactory};
pub use manager::ComponentManager;
pub use metadata::{Cardinality, ComponentMetadata, PolicyOption, ReferenceMetadata, ReferencePolicy};
pub use reference::{BindingPlan, ReferenceChange, ReferenceManager};
pub use registry::ComponentRegistry;
pub use runtime::{ComponentConfigurationDto, ComponentDescriptionDto, ServiceComponentRuntime};

#[cfg(test)]
mod tests;
