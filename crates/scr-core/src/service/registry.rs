use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::event::{EventDispatcher, ServiceEvent, ServiceEventType};
use crate::framework::fault::Fault;
use crate::framework::module::{ModuleId, ModuleInfo};
use crate::service::filter::Filter;
use crate::service::reference::{ServiceId, ServiceReference};
use crate::service::{PropertyMap, ServiceObject};
use crate::utils::sync::{read, write};

/// Produces service objects on demand.
pub trait ServiceFactory: Send + Sync {
    /// Produce the service object for `requester`. `Ok(None)` means the
    /// service is currently unavailable.
    fn get_service(&self, requester: &ModuleInfo, reference: &ServiceReference) -> Result<Option<ServiceObject>, Fault>;

    /// Called when `requester` releases the service.
    fn unget_service(&self, _requester: &ModuleInfo, _reference: &ServiceReference) {}
}

/// Where the registry gets a service object from.
#[derive(Clone)]
pub enum ServiceSource {
    Object(ServiceObject),
    Factory(Arc<dyn ServiceFactory>),
}

impl fmt::Debug for ServiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceSource::Object(_) => f.write_str("ServiceSource::Object"),
            ServiceSource::Factory(_) => f.write_str("ServiceSource::Factory"),
        }
    }
}

struct ServiceEntry {
    reference: ServiceReference,
    source: ServiceSource,
    unregistering: bool,
}

/// In-memory service registry.
///
/// Registry locks are never held while events are delivered or while a
/// [`ServiceFactory`] runs.
pub struct ServiceRegistry {
    services: RwLock<BTreeMap<ServiceId, ServiceEntry>>,
    next_id: AtomicU64,
    dispatcher: Arc<EventDispatcher>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &read(&self.services).len())
            .finish_non_exhaustive()
    }
}

impl ServiceRegistry {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            services: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            dispatcher,
        }
    }

    /// Register a service and announce it with a REGISTERED event.
    pub fn register(
        self: &Arc<Self>,
        owner: &ModuleInfo,
        interfaces: Vec<String>,
        properties: PropertyMap,
        source: ServiceSource,
    ) -> ServiceRegistration {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let reference = ServiceReference::new(id, interfaces, properties, owner.clone());
        write(&self.services).insert(
            id,
            ServiceEntry { reference: reference.clone(), source, unregistering: false },
        );
        log::debug!("Registered service {} {:?} for module '{}'", id, reference.interfaces(), owner.name);
        self.dispatcher
            .fire_service_event(&ServiceEvent::new(ServiceEventType::Registered, reference.clone()));
        ServiceRegistration { reference, registry: Arc::downgrade(self) }
    }

    /// Register a ready-made object under a single interface.
    pub fn register_object<T: Any + Send + Sync>(
        self: &Arc<Self>,
        owner: &ModuleInfo,
        interface: &str,
        properties: PropertyMap,
        object: Arc<T>,
    ) -> ServiceRegistration {
        self.register(owner, vec![interface.to_string()], properties, ServiceSource::Object(object))
    }

    /// All live services matching `filter`, in selection order.
    pub fn find(&self, filter: &Filter) -> Vec<ServiceReference> {
        let mut found: Vec<ServiceReference> = read(&self.services)
            .values()
            .filter(|entry| !entry.unregistering && filter.matches(&entry.reference))
            .map(|entry| entry.reference.clone())
            .collect();
        found.sort_by(|a, b| a.selection_order(b));
        found
    }

    /// The best live service matching `filter`.
    pub fn find_one(&self, filter: &Filter) -> Option<ServiceReference> {
        self.find(filter).into_iter().next()
    }

    /// Current reference for a service id, if still registered.
    pub fn reference(&self, id: ServiceId) -> Option<ServiceReference> {
        read(&self.services).get(&id).map(|entry| entry.reference.clone())
    }

    /// Obtain the service object behind `reference`.
    ///
    /// Factories run without any registry lock held, so they may register or
    /// look up other services.
    pub fn get_service(&self, requester: &ModuleInfo, reference: &ServiceReference) -> Result<Option<ServiceObject>, Fault> {
        let source = match read(&self.services).get(&reference.id()) {
            Some(entry) => entry.source.clone(),
            None => return Ok(None),
        };
        match source {
            ServiceSource::Object(object) => Ok(Some(object)),
            ServiceSource::Factory(factory) => factory.get_service(requester, reference),
        }
    }

    /// Typed variant of [`get_service`](Self::get_service).
    pub fn get_service_as<T: Any + Send + Sync>(
        &self,
        requester: &ModuleInfo,
        reference: &ServiceReference,
    ) -> Result<Option<Arc<T>>, Fault> {
        Ok(self
            .get_service(requester, reference)?
            .and_then(|object| object.downcast::<T>().ok()))
    }

    /// Release a service previously obtained by `requester`.
    pub fn unget_service(&self, requester: &ModuleInfo, reference: &ServiceReference) {
        let source = read(&self.services).get(&reference.id()).map(|entry| entry.source.clone());
        if let Some(ServiceSource::Factory(factory)) = source {
            factory.unget_service(requester, reference);
        }
    }

    /// Replace the properties of a registered service and announce MODIFIED.
    pub fn set_properties(&self, id: ServiceId, properties: PropertyMap) -> Option<ServiceReference> {
        let updated = {
            let mut services = write(&self.services);
            let entry = services.get_mut(&id).filter(|entry| !entry.unregistering)?;
            entry.reference = entry.reference.with_properties(properties);
            entry.reference.clone()
        };
        self.dispatcher
            .fire_service_event(&ServiceEvent::new(ServiceEventType::Modified, updated.clone()));
        Some(updated)
    }

    /// Announce UNREGISTERING while the service is still gettable, then
    /// remove it. Returns false if the service is already gone or going.
    pub fn unregister(&self, id: ServiceId) -> bool {
        let reference = {
            let mut services = write(&self.services);
            match services.get_mut(&id) {
                Some(entry) if !entry.unregistering => {
                    entry.unregistering = true;
                    entry.reference.clone()
                }
                _ => return false,
            }
        };
        self.dispatcher
            .fire_service_event(&ServiceEvent::new(ServiceEventType::Unregistering, reference));
        write(&self.services).remove(&id);
        log::debug!("Unregistered service {}", id);
        true
    }

    /// Unregister every service owned by `owner`. Returns how many were removed.
    pub fn unregister_all(&self, owner: ModuleId) -> usize {
        let ids: Vec<ServiceId> = read(&self.services)
            .values()
            .filter(|entry| entry.reference.owner().id == owner)
            .map(|entry| entry.reference.id())
            .collect();
        ids.into_iter().filter(|id| self.unregister(*id)).count()
    }

    /// Unregister every service.
    pub fn clear(&self) -> usize {
        let ids: Vec<ServiceId> = read(&self.services).keys().copied().collect();
        ids.into_iter().filter(|id| self.unregister(*id)).count()
    }

    pub fn len(&self) -> usize {
        read(&self.services).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owner-side handle for a registered service.
pub struct ServiceRegistration {
    reference: ServiceReference,
    registry: Weak<ServiceRegistry>,
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistration").field("reference", &self.reference).finish()
    }
}

impl ServiceRegistration {
    pub fn reference(&self) -> &ServiceReference {
        &self.reference
    }

    pub fn id(&self) -> ServiceId {
        self.reference.id()
    }

    /// Replace the service properties and refresh the held reference.
    pub fn set_properties(&mut self, properties: PropertyMap) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        match registry.set_properties(self.reference.id(), properties) {
            Some(updated) => {
                self.reference = updated;
                true
            }
            None => false,
        }
    }

    /// Unregister the service. Returns false if it was already unregistered.
    pub fn unregister(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.unregister(self.reference.id()),
            None => false,
        }
    }
}
