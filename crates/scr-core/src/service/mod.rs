//! # Service registry
//!
//! A minimal in-memory service registry: services are registered under one or
//! more interface names with a property map, looked up with a [`Filter`], and
//! every registration change is announced as a
//! [`ServiceEvent`](crate::event::ServiceEvent) through the framework's
//! [`EventDispatcher`](crate::event::EventDispatcher).
//!
//! A service is either a ready object or a [`ServiceFactory`] that produces
//! the object on demand; component configurations register themselves as
//! factories so that activation happens on the first request.
pub mod filter;
pub mod reference;
pub mod registry;

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Property map shared by services, components and configurations.
pub type PropertyMap = BTreeMap<String, serde_json::Value>;

/// A service object as handed out by the registry.
pub type ServiceObject = Arc<dyn Any + Send + Sync>;

pub use filter::Filter;
pub use reference::{ServiceId, ServiceReference};
pub use registry::{ServiceFactory, ServiceRegistration, ServiceRegistry, ServiceSource};
