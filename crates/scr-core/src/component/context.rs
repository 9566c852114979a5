use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::service::{PropertyMap, ServiceObject, ServiceReference};
use crate::utils::sync::{read, write};

/// A service bound to a reference of a live instance.
#[derive(Clone)]
pub struct BoundService {
    pub reference: ServiceReference,
    pub service: Option<ServiceObject>,
}

impl BoundService {
    pub fn new(reference: ServiceReference, service: Option<ServiceObject>) -> Self {
        Self { reference, service }
    }

    /// The service object downcast to `T`.
    pub fn service_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.service.clone().and_then(|object| object.downcast::<T>().ok())
    }
}

impl fmt::Debug for BoundService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundService")
            .field("reference", &self.reference)
            .field("service", &self.service.is_some())
            .finish()
    }
}

/// Per-instance view of bound references and component properties.
///
/// A context lives exactly as long as its instance. Once invalidated it
/// refuses new cache entries.
pub struct ComponentContext {
    bound: RwLock<BTreeMap<String, Vec<BoundService>>>,
    properties: RwLock<PropertyMap>,
    valid: AtomicBool,
}

impl fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound: BTreeMap<String, Vec<u64>> = read(&self.bound)
            .iter()
            .map(|(name, services)| (name.clone(), services.iter().map(|s| s.reference.id()).collect()))
            .collect();
        f.debug_struct("ComponentContext")
            .field("bound", &bound)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl ComponentContext {
    pub fn new<I, S>(reference_names: I, properties: PropertyMap) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bound: RwLock::new(reference_names.into_iter().map(|name| (name.into(), Vec::new())).collect()),
            properties: RwLock::new(properties),
            valid: AtomicBool::new(true),
        }
    }

    /// Record a newly bound service. Fails for an undeclared reference name,
    /// a service already bound under that name, or an invalidated context.
    pub fn add_to_bound_services_cache(&self, name: &str, service: BoundService) -> bool {
        if !self.is_valid() {
            return false;
        }
        let mut bound = write(&self.bound);
        match bound.get_mut(name) {
            Some(services) if !services.iter().any(|s| s.reference == service.reference) => {
                services.push(service);
                true
            }
            _ => false,
        }
    }

    /// Forget a bound service. Returns the removed entry.
    pub fn remove_from_bound_services_cache(&self, name: &str, reference: &ServiceReference) -> Option<BoundService> {
        let mut bound = write(&self.bound);
        let services = bound.get_mut(name)?;
        let index = services.iter().position(|s| &s.reference == reference)?;
        Some(services.remove(index))
    }

    /// First service bound under `name`.
    pub fn locate_service(&self, name: &str) -> Option<ServiceObject> {
        read(&self.bound).get(name)?.iter().find_map(|s| s.service.clone())
    }

    /// Every service bound under `name`, in bind order.
    pub fn locate_services(&self, name: &str) -> Vec<ServiceObject> {
        read(&self.bound)
            .get(name)
            .map(|services| services.iter().filter_map(|s| s.service.clone()).collect())
            .unwrap_or_default()
    }

    pub fn locate_service_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.locate_service(name).and_then(|object| object.downcast::<T>().ok())
    }

    pub fn bound_service(&self, name: &str, reference: &ServiceReference) -> Option<BoundService> {
        read(&self.bound).get(name)?.iter().find(|s| &s.reference == reference).cloned()
    }

    /// References currently bound under `name`.
    pub fn bound_references(&self, name: &str) -> Vec<ServiceReference> {
        read(&self.bound)
            .get(name)
            .map(|services| services.iter().map(|s| s.reference.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of every bound service, keyed by reference name.
    pub fn bound_services(&self) -> BTreeMap<String, Vec<BoundService>> {
        read(&self.bound).clone()
    }

    pub fn properties(&self) -> PropertyMap {
        read(&self.properties).clone()
    }

    pub fn property(&self, key: &str) -> Option<serde_json::Value> {
        read(&self.properties).get(key).cloned()
    }

    pub(crate) fn set_properties(&self, properties: PropertyMap) {
        *write(&self.properties) = properties;
    }

    /// Mark the context dead. Only the first call returns true.
    pub fn invalidate(&self) -> bool {
        self.valid.swap(false, Ordering::SeqCst)
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}
