use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;

use crate::component::instance::{ComponentInstance, ImplementationFactory};
use crate::component::metadata::ComponentMetadata;
use crate::component::ComponentContext;
use crate::event::{ListenerResult, ListenerToken, ModuleEvent, ModuleEventType, ServiceEvent};
use crate::framework::bootstrap::FrameworkInner;
use crate::framework::error::FrameworkError;
use crate::framework::fault::Fault;
use crate::service::{Filter, PropertyMap, ServiceObject, ServiceReference, ServiceRegistration, ServiceSource};
use crate::utils::sync::lock;

/// Framework-assigned module identifier. The system module is id 0.
pub type ModuleId = u64;

/// Identity of a module, carried by events and service references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub name: String,
}

impl ModuleInfo {
    pub fn new(id: ModuleId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

impl fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleState {
    Installed,
    Starting,
    Active,
    Stopping,
    Uninstalled,
}

/// What a module loader hands to [`Framework::install`](crate::framework::Framework::install):
/// the component descriptions of a module and the constructors for their
/// implementations.
#[derive(Clone, Default)]
pub struct ModuleDescriptor {
    pub name: String,
    pub components: Vec<ComponentMetadata>,
    pub implementations: HashMap<String, ImplementationFactory>,
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut implementations: Vec<&String> = self.implementations.keys().collect();
        implementations.sort();
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("components", &self.components)
            .field("implementations", &implementations)
            .finish()
    }
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn with_component(mut self, component: ComponentMetadata) -> Self {
        self.components.push(component);
        self
    }

    /// Register the constructor for an implementation name.
    pub fn with_implementation<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ComponentContext) -> Result<Box<dyn ComponentInstance>, Fault> + Send + Sync + 'static,
    {
        self.implementations.insert(name.into(), Arc::new(factory));
        self
    }
}

pub(crate) struct ModuleInner {
    info: ModuleInfo,
    state: Mutex<ModuleState>,
    components: Vec<Arc<ComponentMetadata>>,
    implementations: HashMap<String, ImplementationFactory>,
    framework: Weak<FrameworkInner>,
}

/// Handle to an installed module. Cheap to clone.
#[derive(Clone)]
pub struct Module {
    inner: Arc<ModuleInner>,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("info", &self.inner.info)
            .field("state", &self.state())
            .field("components", &self.inner.components.len())
            .finish()
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Module {
    pub(crate) fn new(id: ModuleId, descriptor: ModuleDescriptor, framework: Weak<FrameworkInner>) -> Self {
        Self {
            inner: Arc::new(ModuleInner {
                info: ModuleInfo::new(id, descriptor.name),
                state: Mutex::new(ModuleState::Installed),
                components: descriptor.components.into_iter().map(Arc::new).collect(),
                implementations: descriptor.implementations,
                framework,
            }),
        }
    }

    pub fn id(&self) -> ModuleId {
        self.inner.info.id
    }

    pub fn name(&self) -> &str {
        &self.inner.info.name
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.inner.info
    }

    pub fn state(&self) -> ModuleState {
        *lock(&self.inner.state)
    }

    /// Component descriptions declared by this module.
    pub fn components(&self) -> &[Arc<ComponentMetadata>] {
        &self.inner.components
    }

    /// Constructor for `implementation`, or a library-load fault if the module
    /// does not provide it.
    pub fn implementation(&self, implementation: &str) -> Result<ImplementationFactory, Fault> {
        self.inner.implementations.get(implementation).cloned().ok_or_else(|| {
            Fault::library_load(format!(
                "Module '{}' does not provide implementation '{}'",
                self.name(),
                implementation
            ))
        })
    }

    fn framework(&self) -> Result<Arc<FrameworkInner>, FrameworkError> {
        self.inner.framework.upgrade().ok_or(FrameworkError::FrameworkGone)
    }

    fn fire(&self, framework: &FrameworkInner, kind: ModuleEventType) {
        framework.dispatcher.fire_module_event(&ModuleEvent::new(kind, self.info().clone()));
    }

    /// Start the module: STARTING, then STARTED. Starting an active module is a no-op.
    pub fn start(&self) -> Result<(), FrameworkError> {
        let framework = self.framework()?;
        framework.ensure_running("start module")?;
        {
            let mut state = lock(&self.inner.state);
            match *state {
                ModuleState::Installed => *state = ModuleState::Starting,
                ModuleState::Starting | ModuleState::Active => return Ok(()),
                other => {
                    return Err(FrameworkError::InvalidModuleState {
                        operation: "start",
                        module: self.name().to_string(),
                        state: other,
                    });
                }
            }
        }
        log::debug!("Starting module {}", self.info());
        self.fire(&framework, ModuleEventType::Starting);
        *lock(&self.inner.state) = ModuleState::Active;
        self.fire(&framework, ModuleEventType::Started);
        Ok(())
    }

    /// Stop the module: STOPPING, unregister its services, STOPPED.
    /// Stopping a module that is not active is a no-op.
    pub fn stop(&self) -> Result<(), FrameworkError> {
        let framework = self.framework()?;
        {
            let mut state = lock(&self.inner.state);
            match *state {
                ModuleState::Active => *state = ModuleState::Stopping,
                ModuleState::Uninstalled => {
                    return Err(FrameworkError::InvalidModuleState {
                        operation: "stop",
                        module: self.name().to_string(),
                        state: ModuleState::Uninstalled,
                    });
                }
                _ => return Ok(()),
            }
        }
        log::debug!("Stopping module {}", self.info());
        self.fire(&framework, ModuleEventType::Stopping);
        let removed = framework.services.unregister_all(self.id());
        if removed > 0 {
            log::debug!("Unregistered {} leftover services of module {}", removed, self.info());
        }
        *lock(&self.inner.state) = ModuleState::Installed;
        self.fire(&framework, ModuleEventType::Stopped);
        Ok(())
    }

    /// Stop the module if needed and remove it from the framework.
    pub fn uninstall(&self) -> Result<(), FrameworkError> {
        self.stop()?;
        let framework = self.framework()?;
        {
            let mut state = lock(&self.inner.state);
            if *state == ModuleState::Uninstalled {
                return Ok(());
            }
            *state = ModuleState::Uninstalled;
        }
        framework.forget_module(self.id());
        self.fire(&framework, ModuleEventType::Uninstalled);
        Ok(())
    }

    /// Registration and lookup on behalf of this module.
    pub fn context(&self) -> Result<ModuleContext, FrameworkError> {
        Ok(ModuleContext { module: self.clone(), framework: self.framework()? })
    }
}

/// Service and listener operations performed as a particular module.
pub struct ModuleContext {
    module: Module,
    framework: Arc<FrameworkInner>,
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext").field("module", self.module.info()).finish()
    }
}

impl ModuleContext {
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Register `object` under one interface, owned by this module.
    pub fn register_service<T: std::any::Any + Send + Sync>(
        &self,
        interface: &str,
        properties: PropertyMap,
        object: Arc<T>,
    ) -> ServiceRegistration {
        self.framework.services.register_object(self.module.info(), interface, properties, object)
    }

    pub fn register(&self, interfaces: Vec<String>, properties: PropertyMap, source: ServiceSource) -> ServiceRegistration {
        self.framework.services.register(self.module.info(), interfaces, properties, source)
    }

    pub fn find(&self, filter: &Filter) -> Vec<ServiceReference> {
        self.framework.services.find(filter)
    }

    pub fn get_service(&self, reference: &ServiceReference) -> Result<Option<ServiceObject>, Fault> {
        self.framework.services.get_service(self.module.info(), reference)
    }

    pub fn add_service_listener<F>(&self, listener: F, filter: Option<Filter>) -> ListenerToken
    where
        F: Fn(&ServiceEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.framework.dispatcher.add_service_listener(listener, filter)
    }
}
