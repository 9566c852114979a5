pub mod component;
pub mod event;
pub mod framework;
pub mod service;
pub mod utils;

// Re-export key public types for the binary and embedders
pub use component::{
    ComponentConfiguration, ComponentContext, ComponentError, ComponentInstance, ComponentManager, ComponentMetadata,
    ComponentState, ReferenceMetadata, ServiceComponentRuntime,
};
pub use event::{Event, EventDispatcher, FrameworkEvent, FrameworkEventType, ListenerToken};
pub use framework::{Error, Fault, FaultKind, Framework, FrameworkConfig, Module, ModuleDescriptor, Result};
pub use service::{Filter, PropertyMap, ServiceReference, ServiceRegistry};

#[cfg(test)]
mod tests;
