/// Name reported for the system module (module id 0).
pub const SYSTEM_MODULE_NAME: &str = "system";

/// Default prefix for enable/disable worker threads.
pub const DEFAULT_WORKER_PREFIX: &str = "scr-worker";

/// Service property holding the service id.
pub const SERVICE_ID: &str = "service.id";

/// Service property holding the registered interface names.
pub const OBJECT_CLASS: &str = "objectclass";

/// Service property holding the service ranking.
pub const SERVICE_RANKING: &str = "service.ranking";

/// Component property holding the component name.
pub const COMPONENT_NAME: &str = "component.name";

/// Component property holding the component id.
pub const COMPONENT_ID: &str = "component.id";

/// Component property holding the factory configuration id.
pub const COMPONENT_FACTORY_PID: &str = "component.factory.pid";

/// Separator between a factory component name and a factory instance name.
pub const FACTORY_PID_SEPARATOR: char = '~';

/// Diagnostic emitted when a framework listener faults.
pub const FRAMEWORK_LISTENER_FAULT: &str = "A Framework Listener threw an exception:";
