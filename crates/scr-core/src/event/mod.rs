//! # Framework events
//!
//! Framework, module and service events plus the [`EventDispatcher`] that
//! delivers them to listeners synchronously, in registration order, on the
//! thread that triggered the event.
pub mod dispatcher;
pub mod types;

use std::fmt;

use crate::service::Filter;

/// Core event trait
pub trait Event: fmt::Debug + Send + Sync {
    /// Get the name of this event
    fn name(&self) -> &'static str;

    /// Whether a listener registered with `filter` should see this event.
    fn matches(&self, _filter: &Filter) -> bool {
        true
    }
}

/// Re-export important types
pub use dispatcher::{
    EventDispatcher, FrameworkListener, Listener, ListenerResult, ListenerToken, ModuleListener, ServiceListener,
};
pub use types::{
    FrameworkEvent, FrameworkEventType, ModuleEvent, ModuleEventType, OriginEvent, ServiceEvent, ServiceEventType,
};
