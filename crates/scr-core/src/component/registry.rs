use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::component::error::ComponentError;
use crate::component::manager::ComponentManager;
use crate::framework::ModuleId;
use crate::utils::sync::{read, write};

/// Index of every [`ComponentManager`], keyed by owning module and then by
/// component name.
#[derive(Debug)]
pub struct ComponentRegistry {
    managers: RwLock<BTreeMap<ModuleId, BTreeMap<String, Arc<ComponentManager>>>>,
    next_component_id: AtomicU64,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self { managers: RwLock::new(BTreeMap::new()), next_component_id: AtomicU64::new(1) }
    }

    /// Allocate a component id. Ids are never reused.
    pub fn next_component_id(&self) -> u64 {
        self.next_component_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn add(&self, manager: Arc<ComponentManager>) -> Result<(), ComponentError> {
        let mut managers = write(&self.managers);
        let module = managers.entry(manager.module().id()).or_default();
        if module.contains_key(manager.name()) {
            return Err(ComponentError::DuplicateComponent {
                module: manager.module().id(),
                name: manager.name().to_string(),
            });
        }
        module.insert(manager.name().to_string(), manager);
        Ok(())
    }

    pub fn remove(&self, module: ModuleId, name: &str) -> Option<Arc<ComponentManager>> {
        let mut managers = write(&self.managers);
        let removed = managers.get_mut(&module)?.remove(name);
        if managers.get(&module).is_some_and(BTreeMap::is_empty) {
            managers.remove(&module);
        }
        removed
    }

    /// Remove and return every manager owned by `module`.
    pub fn remove_module(&self, module: ModuleId) -> Vec<Arc<ComponentManager>> {
        write(&self.managers)
            .remove(&module)
            .map(|managers| managers.into_values().collect())
            .unwrap_or_default()
    }

    /// Managers owned by `module`, ordered by component name.
    pub fn get_component_managers(&self, module: ModuleId) -> Vec<Arc<ComponentManager>> {
        read(&self.managers)
            .get(&module)
            .map(|managers| managers.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_component_manager(&self, module: ModuleId, name: &str) -> Option<Arc<ComponentManager>> {
        read(&self.managers).get(&module)?.get(name).cloned()
    }

    /// Managers named `name`, across all modules.
    pub fn find_by_name(&self, name: &str) -> Vec<Arc<ComponentManager>> {
        read(&self.managers)
            .values()
            .filter_map(|managers| managers.get(name).cloned())
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<ComponentManager>> {
        read(&self.managers)
            .values()
            .flat_map(|managers| managers.values().cloned())
            .collect()
    }

    pub fn clear(&self) -> Vec<Arc<ComponentManager>> {
        let removed = std::mem::take(&mut *write(&self.managers));
        removed.into_values().flat_map(BTreeMap::into_values).collect()
    }

    pub fn len(&self) -> usize {
        read(&self.managers).values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
