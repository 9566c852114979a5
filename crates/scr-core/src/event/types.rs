use std::fmt;

use crate::event::Event;
use crate::framework::fault::Fault;
use crate::framework::module::ModuleInfo;
use crate::service::{Filter, ServiceReference};

/// Framework event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameworkEventType {
    /// The framework has started
    Started,
    /// A contained fault, typically from a listener callback
    Error,
    Warning,
    Info,
    /// The framework has stopped
    Stopped,
    /// `wait_for_stop` timed out before the framework stopped
    WaitTimedOut,
}

impl fmt::Display for FrameworkEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameworkEventType::Started => "FRAMEWORK_STARTED",
            FrameworkEventType::Error => "FRAMEWORK_ERROR",
            FrameworkEventType::Warning => "FRAMEWORK_WARNING",
            FrameworkEventType::Info => "FRAMEWORK_INFO",
            FrameworkEventType::Stopped => "FRAMEWORK_STOPPED",
            FrameworkEventType::WaitTimedOut => "FRAMEWORK_WAIT_TIMEDOUT",
        };
        f.write_str(name)
    }
}

/// The event whose listener fault produced a synthesized FRAMEWORK_ERROR.
#[derive(Debug, Clone)]
pub enum OriginEvent {
    Module(ModuleEvent),
    Service(ServiceEvent),
}

/// Framework lifecycle event
#[derive(Debug, Clone)]
pub struct FrameworkEvent {
    kind: FrameworkEventType,
    source: ModuleInfo,
    message: String,
    fault: Option<Fault>,
    origin: Option<Box<OriginEvent>>,
}

impl FrameworkEvent {
    pub fn new(kind: FrameworkEventType, source: ModuleInfo, message: impl Into<String>) -> Self {
        Self { kind, source, message: message.into(), fault: None, origin: None }
    }

    /// FRAMEWORK_ERROR carrying the captured fault and the event being delivered.
    pub fn error(source: ModuleInfo, fault: Fault, origin: OriginEvent) -> Self {
        Self {
            kind: FrameworkEventType::Error,
            source,
            message: format!("A listener threw an exception while handling {}", origin.name()),
            fault: Some(fault),
            origin: Some(Box::new(origin)),
        }
    }

    pub fn kind(&self) -> FrameworkEventType {
        self.kind
    }

    pub fn source(&self) -> &ModuleInfo {
        &self.source
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn origin(&self) -> Option<&OriginEvent> {
        self.origin.as_deref()
    }
}

impl OriginEvent {
    fn name(&self) -> &'static str {
        match self {
            OriginEvent::Module(event) => event.name(),
            OriginEvent::Service(event) => event.name(),
        }
    }
}

impl Event for FrameworkEvent {
    fn name(&self) -> &'static str {
        match self.kind {
            FrameworkEventType::Started => "framework.started",
            FrameworkEventType::Error => "framework.error",
            FrameworkEventType::Warning => "framework.warning",
            FrameworkEventType::Info => "framework.info",
            FrameworkEventType::Stopped => "framework.stopped",
            FrameworkEventType::WaitTimedOut => "framework.wait_timedout",
        }
    }
}

/// Module lifecycle event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleEventType {
    Installed,
    Starting,
    Started,
    Stopping,
    Stopped,
    Uninstalled,
}

/// Module lifecycle event
#[derive(Debug, Clone)]
pub struct ModuleEvent {
    kind: ModuleEventType,
    module: ModuleInfo,
}

impl ModuleEvent {
    pub fn new(kind: ModuleEventType, module: ModuleInfo) -> Self {
        Self { kind, module }
    }

    pub fn kind(&self) -> ModuleEventType {
        self.kind
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }
}

impl Event for ModuleEvent {
    fn name(&self) -> &'static str {
        match self.kind {
            ModuleEventType::Installed => "module.installed",
            ModuleEventType::Starting => "module.starting",
            ModuleEventType::Started => "module.started",
            ModuleEventType::Stopping => "module.stopping",
            ModuleEventType::Stopped => "module.stopped",
            ModuleEventType::Uninstalled => "module.uninstalled",
        }
    }
}

/// Service registry event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceEventType {
    Registered,
    Modified,
    /// Sent while the service is still registered
    Unregistering,
}

/// Service registry event
#[derive(Debug, Clone)]
pub struct ServiceEvent {
    kind: ServiceEventType,
    reference: ServiceReference,
}

impl ServiceEvent {
    pub fn new(kind: ServiceEventType, reference: ServiceReference) -> Self {
        Self { kind, reference }
    }

    pub fn kind(&self) -> ServiceEventType {
        self.kind
    }

    pub fn reference(&self) -> &ServiceReference {
        &self.reference
    }
}

impl Event for ServiceEvent {
    fn name(&self) -> &'static str {
        match self.kind {
            ServiceEventType::Registered => "service.registered",
            ServiceEventType::Modified => "service.modified",
            ServiceEventType::Unregistering => "service.unregistering",
        }
    }

    // MODIFIED skips the property constraints so listeners can observe a
    // service leaving their filter.
    fn matches(&self, filter: &Filter) -> bool {
        match self.kind {
            ServiceEventType::Modified => filter.interface().is_none_or(|i| self.reference.provides(i)),
            _ => filter.matches(&self.reference),
        }
    }
}
