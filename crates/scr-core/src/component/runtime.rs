use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;

use crate::component::configuration::{ComponentConfiguration, ComponentState, ReferenceState};
use crate::component::error::ComponentError;
use crate::component::handle::CompletionHandle;
use crate::component::manager::ComponentManager;
use crate::component::metadata::ReferenceMetadata;
use crate::component::registry::ComponentRegistry;
use crate::event::{ListenerToken, ModuleEvent, ModuleEventType};
use crate::framework::{Framework, Module, ModuleInfo, ModuleState};
use crate::service::PropertyMap;
use crate::utils::sync::lock;

/// Description of a declared component, for tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDescriptionDto {
    pub name: String,
    pub module: ModuleInfo,
    pub implementation: String,
    pub service_interfaces: Vec<String>,
    pub immediate: bool,
    pub factory: bool,
    pub default_enabled: bool,
    pub enabled: bool,
    pub references: Vec<ReferenceMetadata>,
    pub properties: PropertyMap,
}

/// Current state of one component configuration, for tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentConfigurationDto {
    pub name: String,
    pub component_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_id: Option<String>,
    pub module: ModuleInfo,
    pub state: ComponentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<u64>,
    pub references: Vec<ReferenceState>,
    pub properties: PropertyMap,
}

impl ComponentConfigurationDto {
    fn from_configuration(configuration: &ComponentConfiguration) -> Self {
        Self {
            name: configuration.name().to_string(),
            component_id: configuration.identity().component_id(),
            configuration_id: configuration.identity().factory_id().map(str::to_string),
            module: configuration.module().info().clone(),
            state: configuration.state(),
            instance_id: configuration.instance_id(),
            references: configuration.reference_states(),
            properties: configuration.properties(),
        }
    }
}

/// Extender that turns the component descriptions of started modules into
/// enabled [`ComponentManager`]s, and retires them when the module stops.
pub struct ServiceComponentRuntime {
    framework: Framework,
    components: Arc<ComponentRegistry>,
    listener: Mutex<Option<ListenerToken>>,
}

impl fmt::Debug for ServiceComponentRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceComponentRuntime")
            .field("components", &self.components.len())
            .finish()
    }
}

impl ServiceComponentRuntime {
    /// Attach a runtime to `framework`. Modules that are already active have
    /// their components loaded immediately.
    pub fn new(framework: &Framework) -> Arc<Self> {
        let runtime = Arc::new(Self {
            framework: framework.clone(),
            components: Arc::new(ComponentRegistry::new()),
            listener: Mutex::new(None),
        });

        let weak: Weak<Self> = Arc::downgrade(&runtime);
        let token = framework.add_module_listener(move |event| {
            if let Some(runtime) = weak.upgrade() {
                runtime.on_module_event(event);
            }
            Ok(())
        });
        *lock(&runtime.listener) = Some(token);

        for module in framework.modules() {
            if module.state() == ModuleState::Active {
                runtime.load_components(&module);
            }
        }
        runtime
    }

    pub fn framework(&self) -> &Framework {
        &self.framework
    }

    pub fn components(&self) -> &Arc<ComponentRegistry> {
        &self.components
    }

    fn on_module_event(&self, event: &ModuleEvent) {
        match event.kind() {
            ModuleEventType::Started => match self.framework.module(event.module().id) {
                Ok(module) => self.load_components(&module),
                Err(e) => log::warn!("Started module {} is no longer installed: {}", event.module(), e),
            },
            ModuleEventType::Stopping => self.unload_components(event.module()),
            _ => {}
        }
    }

    /// Create a manager for every valid description of `module` and enable
    /// those enabled by default.
    pub fn load_components(&self, module: &Module) {
        for metadata in module.components() {
            if let Err(e) = metadata.validate() {
                log::error!("Skipping component of module {}: {}", module.info(), e);
                continue;
            }
            let manager =
                ComponentManager::new(metadata.clone(), module.clone(), self.framework.clone(), &self.components);
            if let Err(e) = self.components.add(manager.clone()) {
                log::error!("Skipping component of module {}: {}", module.info(), e);
                continue;
            }
            if metadata.enabled {
                if let Err(e) = manager.enable().wait() {
                    log::warn!("Enabling component '{}' failed: {}", manager.name(), e);
                }
            }
        }
        log::debug!("Loaded {} components from module {}", module.components().len(), module.info());
    }

    fn unload_components(&self, module: &ModuleInfo) {
        for manager in self.components.remove_module(module.id) {
            if let Err(e) = manager.disable().wait() {
                log::warn!("Disabling component '{}' failed: {}", manager.name(), e);
            }
        }
    }

    /// First manager named `name`, in module order.
    pub fn find_manager(&self, name: &str) -> Option<Arc<ComponentManager>> {
        self.components.find_by_name(name).into_iter().next()
    }

    fn require_manager(&self, name: &str) -> Result<Arc<ComponentManager>, ComponentError> {
        self.find_manager(name).ok_or_else(|| ComponentError::UnknownComponent(name.to_string()))
    }

    pub fn component_description_dtos(&self) -> Vec<ComponentDescriptionDto> {
        self.components
            .all()
            .iter()
            .map(|manager| {
                let metadata = manager.metadata();
                ComponentDescriptionDto {
                    name: metadata.name.clone(),
                    module: manager.module().info().clone(),
                    implementation: metadata.implementation.clone(),
                    service_interfaces: metadata.service_interfaces.clone(),
                    immediate: metadata.is_immediate(),
                    factory: metadata.factory,
                    default_enabled: metadata.enabled,
                    enabled: manager.is_enabled(),
                    references: metadata.references.clone(),
                    properties: metadata.properties.clone(),
                }
            })
            .collect()
    }

    /// Configurations of every component named `name`.
    pub fn component_configuration_dtos(&self, name: &str) -> Vec<ComponentConfigurationDto> {
        self.components
            .find_by_name(name)
            .iter()
            .flat_map(|manager| manager.configurations())
            .map(|configuration| ComponentConfigurationDto::from_configuration(&configuration))
            .collect()
    }

    /// Configurations of every component.
    pub fn all_configuration_dtos(&self) -> Vec<ComponentConfigurationDto> {
        self.components
            .all()
            .iter()
            .flat_map(|manager| manager.configurations())
            .map(|configuration| ComponentConfigurationDto::from_configuration(&configuration))
            .collect()
    }

    pub fn enable_component(&self, name: &str) -> Result<CompletionHandle, ComponentError> {
        Ok(self.require_manager(name)?.enable())
    }

    pub fn disable_component(&self, name: &str) -> Result<CompletionHandle, ComponentError> {
        Ok(self.require_manager(name)?.disable())
    }

    pub fn create_factory_configuration(
        &self,
        name: &str,
        instance: &str,
        properties: PropertyMap,
    ) -> Result<String, ComponentError> {
        self.require_manager(name)?.create_factory_configuration(instance, properties)
    }

    /// Detach from the framework and disable every component.
    pub fn shutdown(&self) {
        if let Some(token) = lock(&self.listener).take() {
            self.framework.remove_listener(token);
        }
        for manager in self.components.clear() {
            if let Err(e) = manager.disable().wait() {
                log::warn!("Disabling component '{}' failed: {}", manager.name(), e);
            }
        }
        log::debug!("Service component runtime shut down");
    }
}
