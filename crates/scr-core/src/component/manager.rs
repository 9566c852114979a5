use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::thread;

use crate::component::configuration::{ComponentConfiguration, ConfigurationIdentity};
use crate::component::error::ComponentError;
use crate::component::handle::CompletionHandle;
use crate::component::metadata::ComponentMetadata;
use crate::component::registry::ComponentRegistry;
use crate::framework::constants::FACTORY_PID_SEPARATOR;
use crate::framework::{Framework, Module};
use crate::service::PropertyMap;
use crate::utils::sync::lock;

struct FactoryEntry {
    properties: PropertyMap,
    configuration: Option<Arc<ComponentConfiguration>>,
}

struct ManagerState {
    enabled: bool,
    singleton_properties: PropertyMap,
    singleton: Option<Arc<ComponentConfiguration>>,
    factory: BTreeMap<String, FactoryEntry>,
}

/// Owns the configurations of one declared component.
///
/// An ordinary component has one singleton configuration while enabled. A
/// factory component has one configuration per factory configuration; the
/// factory configurations themselves (ids and properties) outlive
/// enable/disable cycles.
pub struct ComponentManager {
    metadata: Arc<ComponentMetadata>,
    component_id: u64,
    module: Module,
    framework: Framework,
    components: Weak<ComponentRegistry>,
    state: Mutex<ManagerState>,
    this: Weak<ComponentManager>,
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("name", &self.metadata.name)
            .field("component_id", &self.component_id)
            .field("module", self.module.info())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl ComponentManager {
    pub fn new(
        metadata: Arc<ComponentMetadata>,
        module: Module,
        framework: Framework,
        components: &Arc<ComponentRegistry>,
    ) -> Arc<Self> {
        let component_id = components.next_component_id();
        Arc::new_cyclic(|this| Self {
            metadata,
            component_id,
            module,
            framework,
            components: Arc::downgrade(components),
            state: Mutex::new(ManagerState {
                enabled: false,
                singleton_properties: PropertyMap::new(),
                singleton: None,
                factory: BTreeMap::new(),
            }),
            this: this.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn metadata(&self) -> &Arc<ComponentMetadata> {
        &self.metadata
    }

    pub fn component_id(&self) -> u64 {
        self.component_id
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    /// Live configurations: the singleton, or one per factory configuration.
    pub fn configurations(&self) -> Vec<Arc<ComponentConfiguration>> {
        let state = lock(&self.state);
        state
            .singleton
            .iter()
            .cloned()
            .chain(state.factory.values().filter_map(|entry| entry.configuration.clone()))
            .collect()
    }

    /// Live configuration for a factory configuration id.
    pub fn factory_configuration(&self, id: &str) -> Option<Arc<ComponentConfiguration>> {
        lock(&self.state).factory.get(id)?.configuration.clone()
    }

    pub fn factory_configuration_ids(&self) -> Vec<String> {
        lock(&self.state).factory.keys().cloned().collect()
    }

    fn new_configuration(&self, identity: ConfigurationIdentity, properties: PropertyMap) -> Arc<ComponentConfiguration> {
        ComponentConfiguration::new(
            identity,
            self.metadata.clone(),
            self.module.clone(),
            self.framework.clone(),
            self.components.clone(),
            properties,
        )
    }

    /// Run `work` on a named worker thread.
    fn spawn<F>(&self, action: &str, work: F) -> CompletionHandle
    where
        F: FnOnce(&ComponentManager) + Send + 'static,
    {
        let Some(this) = self.this.upgrade() else {
            return CompletionHandle::ready(
                self.name(),
                Err(ComponentError::TaskAborted {
                    component: self.name().to_string(),
                    reason: "component manager dropped".to_string(),
                }),
            );
        };
        let (completer, handle) = CompletionHandle::channel(self.name());
        let thread_name =
            format!("{}-{}-{}", self.framework.config().worker_thread_prefix, action, self.component_id);
        let spawned = thread::Builder::new().name(thread_name).spawn(move || {
            work(this.as_ref());
            completer.complete(Ok(()));
        });
        if let Err(e) = spawned {
            // The completer was dropped with the closure; the handle reports the abort.
            log::error!("Could not start {} worker for component '{}': {}", action, self.name(), e);
        }
        handle
    }

    /// Enable the component asynchronously.
    pub fn enable(&self) -> CompletionHandle {
        self.spawn("enable", ComponentManager::enable_now)
    }

    /// Disable the component asynchronously.
    pub fn disable(&self) -> CompletionHandle {
        self.spawn("disable", ComponentManager::disable_now)
    }

    /// Create and enable the configurations on the calling thread.
    pub fn enable_now(&self) {
        let configurations = {
            let mut state = lock(&self.state);
            if state.enabled {
                return;
            }
            state.enabled = true;
            if self.metadata.factory {
                let mut created = Vec::new();
                for (id, entry) in state.factory.iter_mut() {
                    let identity = ConfigurationIdentity::Factory {
                        component_id: self.component_id,
                        configuration_id: id.clone(),
                    };
                    let configuration = self.new_configuration(identity, entry.properties.clone());
                    entry.configuration = Some(configuration.clone());
                    created.push(configuration);
                }
                created
            } else {
                let identity = ConfigurationIdentity::Singleton { component_id: self.component_id };
                let configuration = self.new_configuration(identity, state.singleton_properties.clone());
                state.singleton = Some(configuration.clone());
                vec![configuration]
            }
        };
        log::debug!("Enabling component '{}' ({} configurations)", self.name(), configurations.len());
        for configuration in configurations {
            configuration.enable();
        }
    }

    /// Retire every configuration on the calling thread.
    pub fn disable_now(&self) {
        let configurations = {
            let mut state = lock(&self.state);
            if !state.enabled {
                return;
            }
            state.enabled = false;
            let mut retired: Vec<Arc<ComponentConfiguration>> = state.singleton.take().into_iter().collect();
            retired.extend(state.factory.values_mut().filter_map(|entry| entry.configuration.take()));
            retired
        };
        log::debug!("Disabling component '{}'", self.name());
        for configuration in configurations {
            configuration.disable();
        }
    }

    /// Add a factory configuration `name~instance`. It gets a live
    /// configuration immediately if the component is enabled.
    pub fn create_factory_configuration(&self, instance: &str, properties: PropertyMap) -> Result<String, ComponentError> {
        if !self.metadata.factory {
            return Err(ComponentError::NotFactory(self.name().to_string()));
        }
        let id = format!("{}{}{}", self.name(), FACTORY_PID_SEPARATOR, instance);
        let configuration = {
            let mut state = lock(&self.state);
            if state.factory.contains_key(&id) {
                return Err(ComponentError::DuplicateFactoryConfiguration(id));
            }
            let configuration = state.enabled.then(|| {
                let identity = ConfigurationIdentity::Factory {
                    component_id: self.component_id,
                    configuration_id: id.clone(),
                };
                self.new_configuration(identity, properties.clone())
            });
            state.factory.insert(id.clone(), FactoryEntry { properties, configuration: configuration.clone() });
            configuration
        };
        if let Some(configuration) = configuration {
            configuration.enable();
        }
        log::debug!("Created factory configuration '{}'", id);
        Ok(id)
    }

    /// Replace the properties of a configuration. `id` is a factory
    /// configuration id, or the component name for the singleton.
    pub fn update_configuration(&self, id: &str, properties: PropertyMap) -> Result<(), ComponentError> {
        let configuration = {
            let mut state = lock(&self.state);
            if !self.metadata.factory && id == self.name() {
                state.singleton_properties = properties.clone();
                state.singleton.clone()
            } else {
                let entry = state
                    .factory
                    .get_mut(id)
                    .ok_or_else(|| ComponentError::UnknownConfiguration(id.to_string()))?;
                entry.properties = properties.clone();
                entry.configuration.clone()
            }
        };
        if let Some(configuration) = configuration {
            configuration.update_properties(properties);
        }
        Ok(())
    }

    pub fn delete_factory_configuration(&self, id: &str) -> Result<(), ComponentError> {
        let entry = lock(&self.state)
            .factory
            .remove(id)
            .ok_or_else(|| ComponentError::UnknownConfiguration(id.to_string()))?;
        if let Some(configuration) = entry.configuration {
            configuration.disable();
        }
        Ok(())
    }
}
