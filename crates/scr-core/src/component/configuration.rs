//! # Component configurations
//!
//! A [`ComponentConfiguration`] is one instance-producing unit of a declared
//! component: the singleton configuration of an ordinary component, or one
//! factory configuration of a factory component. It owns
//!
//! - the state machine `UNSATISFIED_REFERENCE -> SATISFIED -> ACTIVE`, plus
//!   the terminal `DISABLED`,
//! - one [`ReferenceManager`] per declared reference, fed by service listeners,
//! - the registration of the provided services, backed by a service factory
//!   that routes every request into [`ComponentConfiguration::get_service`],
//! - the instance-context slot: at most one live instance and its context,
//!   guarded by a single mutex.
//!
//! ## Locking
//!
//! The slot mutex is held for the whole of activation, teardown, bind, unbind
//! and modification, so user hooks run under it. The service objects of
//! dependencies are obtained before the slot is taken: obtaining one may
//! activate its provider, and a provider's security fault disables
//! components whose teardown needs this slot. The state mutex and the
//! reference-manager mutexes are only taken briefly, and may be taken while
//! the slot is held, never the other way round. Service registration and
//! unregistration happen with no lock held, because they deliver events
//! synchronously.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use serde::Serialize;

use crate::component::context::{BoundService, ComponentContext};
use crate::component::error::ComponentError;
use crate::component::instance::ComponentInstance;
use crate::component::metadata::ComponentMetadata;
use crate::component::reference::{BindingPlan, ReferenceManager};
use crate::component::registry::ComponentRegistry;
use crate::event::{ListenerToken, ServiceEvent};
use crate::framework::constants;
use crate::framework::diagnostics::{Severity, SharedSink};
use crate::framework::fault::{self, Fault, FaultKind};
use crate::framework::{Framework, Module, ModuleId, ModuleInfo};
use crate::service::{
    PropertyMap, ServiceFactory, ServiceId, ServiceObject, ServiceReference, ServiceRegistration, ServiceSource,
};
use crate::utils::sync::{lock, read, write};

const ACTIVATE_FAILED: &str = "Activate failed. Component no longer in Active state.";
const BOUND_CACHE_FAILURE: &str = "Failure while trying to add reference to BoundServices Cache";
const SECURITY_DISABLE_FAILURE: &str = "A security exception handler caused a component manager to disable, \
     leading to an exception disabling component manager:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentState {
    /// At least one mandatory reference has no match.
    UnsatisfiedReference,
    /// Every reference is satisfied; no instance needs to exist.
    Satisfied,
    /// An instance exists or is being created.
    Active,
    Disabled,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ComponentState::UnsatisfiedReference => "UNSATISFIED_REFERENCE",
            ComponentState::Satisfied => "SATISFIED",
            ComponentState::Active => "ACTIVE",
            ComponentState::Disabled => "DISABLED",
        };
        f.write_str(text)
    }
}

/// Which configuration of a component this is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConfigurationIdentity {
    Singleton { component_id: u64 },
    Factory { component_id: u64, configuration_id: String },
}

impl ConfigurationIdentity {
    pub fn component_id(&self) -> u64 {
        match self {
            ConfigurationIdentity::Singleton { component_id } => *component_id,
            ConfigurationIdentity::Factory { component_id, .. } => *component_id,
        }
    }

    /// The factory configuration id, `component~instance`.
    pub fn factory_id(&self) -> Option<&str> {
        match self {
            ConfigurationIdentity::Singleton { .. } => None,
            ConfigurationIdentity::Factory { configuration_id, .. } => Some(configuration_id),
        }
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, ConfigurationIdentity::Factory { .. })
    }
}

/// What a successful activation hands back.
#[derive(Clone)]
pub struct ActiveInstance {
    pub id: u64,
    pub service: Option<ServiceObject>,
}

impl fmt::Debug for ActiveInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveInstance")
            .field("id", &self.id)
            .field("service", &self.service.is_some())
            .finish()
    }
}

/// Diagnostic view of one reference of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceState {
    pub name: String,
    pub satisfied: bool,
    pub matches: Vec<ServiceId>,
    pub bound: Vec<ServiceId>,
}

struct InstanceContextPair {
    id: u64,
    instance: Box<dyn ComponentInstance>,
    context: Arc<ComponentContext>,
}

impl InstanceContextPair {
    fn active(&self) -> ActiveInstance {
        ActiveInstance { id: self.id, service: self.instance.service() }
    }
}

/// Routes registry requests for the provided services into the configuration.
struct ConfigurationServiceFactory {
    configuration: Weak<ComponentConfiguration>,
}

impl ServiceFactory for ConfigurationServiceFactory {
    fn get_service(&self, requester: &ModuleInfo, reference: &ServiceReference) -> Result<Option<ServiceObject>, Fault> {
        match self.configuration.upgrade() {
            Some(configuration) => configuration.get_service(requester, reference),
            None => Ok(None),
        }
    }

    fn unget_service(&self, requester: &ModuleInfo, reference: &ServiceReference) {
        if let Some(configuration) = self.configuration.upgrade() {
            configuration.unget_service(requester, reference);
        }
    }
}

pub struct ComponentConfiguration {
    identity: ConfigurationIdentity,
    metadata: Arc<ComponentMetadata>,
    module: Module,
    framework: Framework,
    components: Weak<ComponentRegistry>,
    sink: SharedSink,
    state: Mutex<ComponentState>,
    retired: AtomicBool,
    slot: Mutex<Option<InstanceContextPair>>,
    references: Vec<Mutex<ReferenceManager>>,
    listeners: Mutex<Vec<ListenerToken>>,
    registration: Mutex<Option<ServiceRegistration>>,
    properties: RwLock<PropertyMap>,
    next_instance_id: AtomicU64,
    this: Weak<ComponentConfiguration>,
}

impl fmt::Debug for ComponentConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentConfiguration")
            .field("name", &self.metadata.name)
            .field("identity", &self.identity)
            .field("state", &self.state())
            .field("instance", &self.instance_id())
            .finish()
    }
}

impl ComponentConfiguration {
    pub(crate) fn new(
        identity: ConfigurationIdentity,
        metadata: Arc<ComponentMetadata>,
        module: Module,
        framework: Framework,
        components: Weak<ComponentRegistry>,
        properties: PropertyMap,
    ) -> Arc<Self> {
        let references = metadata
            .references
            .iter()
            .map(|reference| Mutex::new(ReferenceManager::new(reference.clone())))
            .collect();
        let sink = framework.sink().clone();
        Arc::new_cyclic(|this| Self {
            identity,
            metadata,
            module,
            framework,
            components,
            sink,
            state: Mutex::new(ComponentState::Disabled),
            retired: AtomicBool::new(false),
            slot: Mutex::new(None),
            references,
            listeners: Mutex::new(Vec::new()),
            registration: Mutex::new(None),
            properties: RwLock::new(properties),
            next_instance_id: AtomicU64::new(1),
            this: this.clone(),
        })
    }

    pub fn identity(&self) -> &ConfigurationIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn metadata(&self) -> &Arc<ComponentMetadata> {
        &self.metadata
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn state(&self) -> ComponentState {
        *lock(&self.state)
    }

    /// Id of the live instance, if any. Ids increase with every new instance.
    pub fn instance_id(&self) -> Option<u64> {
        lock(&self.slot).as_ref().map(|pair| pair.id)
    }

    pub fn component_context(&self) -> Option<Arc<ComponentContext>> {
        lock(&self.slot).as_ref().map(|pair| pair.context.clone())
    }

    /// Run `f` against the live instance with the slot held.
    pub fn with_instance<R>(&self, f: impl FnOnce(&mut dyn ComponentInstance, &ComponentContext) -> R) -> Option<R> {
        let mut slot = lock(&self.slot);
        let pair = slot.as_mut()?;
        Some(f(pair.instance.as_mut(), &pair.context))
    }

    /// Merged component properties: declared, then configuration, then the
    /// component identity properties.
    pub fn properties(&self) -> PropertyMap {
        let mut merged = self.metadata.properties.clone();
        merged.extend(read(&self.properties).iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.insert(constants::COMPONENT_NAME.to_string(), self.metadata.name.clone().into());
        merged.insert(constants::COMPONENT_ID.to_string(), self.identity.component_id().into());
        if let Some(factory_id) = self.identity.factory_id() {
            merged.insert(constants::COMPONENT_FACTORY_PID.to_string(), factory_id.into());
        }
        merged
    }

    pub fn reference_states(&self) -> Vec<ReferenceState> {
        let context = self.component_context();
        self.references
            .iter()
            .map(|manager| {
                let manager = lock(manager);
                let bound = context
                    .as_ref()
                    .map(|c| c.bound_references(manager.name()).iter().map(ServiceReference::id).collect())
                    .unwrap_or_default();
                ReferenceState {
                    name: manager.name().to_string(),
                    satisfied: manager.is_satisfied(),
                    matches: manager.matches().iter().map(ServiceReference::id).collect(),
                    bound,
                }
            })
            .collect()
    }

    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>) {
        self.sink.log(severity, message, fault);
    }

    //--------------------------------------------------
    // Lifecycle
    //--------------------------------------------------

    /// Start tracking references and compute the initial state.
    pub(crate) fn enable(&self) {
        {
            let mut state = lock(&self.state);
            if *state != ComponentState::Disabled || self.retired.load(Ordering::SeqCst) {
                return;
            }
            *state = ComponentState::UnsatisfiedReference;
        }
        let dispatcher = self.framework.dispatcher();
        for (index, manager) in self.references.iter().enumerate() {
            let filter = lock(manager).filter().clone();
            let this = self.this.clone();
            let token = dispatcher.add_service_listener(
                move |event| {
                    if let Some(configuration) = this.upgrade() {
                        configuration.on_reference_event(index, event);
                    }
                    Ok(())
                },
                Some(filter),
            );
            lock(&self.listeners).push(token);

            let mut manager = lock(manager);
            let candidates = self.framework.services().find(manager.filter());
            manager.initialize(candidates);
        }
        log::debug!("Enabled configuration {:?} of component '{}'", self.identity, self.name());
        self.refresh_state();
    }

    /// Retire the configuration: stop tracking, unregister, destroy the instance.
    /// Returns false if it was already retired.
    pub(crate) fn disable(&self) -> bool {
        {
            let mut state = lock(&self.state);
            if self.retired.swap(true, Ordering::SeqCst) {
                return false;
            }
            *state = ComponentState::Disabled;
        }
        let tokens: Vec<ListenerToken> = lock(&self.listeners).drain(..).collect();
        for token in tokens {
            self.framework.dispatcher().remove_listener(token);
        }
        self.unregister_service();
        self.destroy_component_instances();
        log::debug!("Disabled configuration {:?} of component '{}'", self.identity, self.name());
        true
    }

    fn all_references_satisfied(&self) -> bool {
        self.references.iter().all(|manager| lock(manager).is_satisfied())
    }

    /// Move between UNSATISFIED_REFERENCE and SATISFIED to match the
    /// reference managers, registering or tearing down as needed.
    fn refresh_state(&self) {
        let satisfied = self.all_references_satisfied();
        let transition = {
            let mut state = lock(&self.state);
            match (*state, satisfied) {
                (ComponentState::UnsatisfiedReference, true) => {
                    *state = ComponentState::Satisfied;
                    Some(true)
                }
                (ComponentState::Satisfied | ComponentState::Active, false) => {
                    *state = ComponentState::UnsatisfiedReference;
                    Some(false)
                }
                _ => None,
            }
        };
        match transition {
            Some(true) => {
                log::debug!("Component '{}' is satisfied", self.name());
                self.register_service();
                if self.metadata.is_immediate() {
                    self.activate_eagerly();
                }
            }
            Some(false) => {
                log::debug!("Component '{}' lost a mandatory reference", self.name());
                self.unregister_service();
                self.destroy_component_instances();
            }
            None => {}
        }
    }

    fn register_service(&self) {
        if !self.metadata.provides_service() {
            return;
        }
        let source = ServiceSource::Factory(Arc::new(ConfigurationServiceFactory { configuration: self.this.clone() }));
        let registration = self.framework.services().register(
            self.module.info(),
            self.metadata.service_interfaces.clone(),
            self.properties(),
            source,
        );
        let stale = lock(&self.registration).replace(registration);
        if let Some(stale) = stale {
            stale.unregister();
        }
        // The state may have moved while REGISTERED was being delivered.
        if !matches!(self.state(), ComponentState::Satisfied | ComponentState::Active) {
            self.unregister_service();
        }
    }

    fn unregister_service(&self) {
        let registration = lock(&self.registration).take();
        if let Some(registration) = registration {
            registration.unregister();
        }
    }

    fn activate_eagerly(&self) {
        if self.activate(self.module.info()).is_err() {
            log::debug!("Immediate activation of '{}' failed", self.name());
        }
    }

    /// Tear down and rebuild after a static reference change.
    fn recycle(&self) {
        log::debug!("Recycling component '{}'", self.name());
        self.unregister_service();
        self.destroy_component_instances();
        if self.state() == ComponentState::Satisfied {
            self.register_service();
            if self.metadata.is_immediate() {
                self.activate_eagerly();
            }
        }
    }

    fn on_reference_event(&self, index: usize, event: &ServiceEvent) {
        let (Some(manager), Some(reference)) = (self.references.get(index), self.metadata.references.get(index))
        else {
            return;
        };
        let change = lock(manager).update(event);
        if change.is_empty() || self.state() == ComponentState::Disabled {
            return;
        }
        if change.satisfaction.is_some() {
            self.refresh_state();
            return;
        }
        let Some(context) = self.component_context() else {
            return;
        };
        let name = reference.name.as_str();
        let plan = lock(manager).plan(&context.bound_references(name), &change);
        match plan {
            BindingPlan::Keep => {}
            BindingPlan::Rebind { unbind, bind } => {
                let arrived: Vec<BoundService> = bind.iter().filter_map(|r| self.fetch(name, r)).collect();
                let mut slot = lock(&self.slot);
                // A different instance bound its targets fresh at activation.
                match slot.as_mut().filter(|pair| Arc::ptr_eq(&pair.context, &context)) {
                    Some(pair) => {
                        for departed in &unbind {
                            self.unbind_from(pair, name, departed);
                        }
                        for bound in arrived {
                            self.bind_into(pair, name, bound);
                        }
                    }
                    None => {
                        drop(slot);
                        self.release(arrived.iter());
                    }
                }
            }
            BindingPlan::Recycle => self.recycle(),
        }
    }

    //--------------------------------------------------
    // Instance operations
    //--------------------------------------------------

    /// Obtain the live instance, creating it if needed.
    ///
    /// Concurrent callers share one instance. Library-load and security
    /// faults are returned; other faults are logged and yield `Ok(None)`.
    pub fn activate(&self, requester: &ModuleInfo) -> Result<Option<ActiveInstance>, Fault> {
        {
            let mut state = lock(&self.state);
            if *state == ComponentState::Satisfied {
                *state = ComponentState::Active;
            }
        }
        {
            let slot = lock(&self.slot);
            if self.state() != ComponentState::Active {
                self.log(Severity::Warning, ACTIVATE_FAILED, None);
                return Ok(None);
            }
            if let Some(pair) = slot.as_ref() {
                return Ok(Some(pair.active()));
            }
        }

        let fetched = self.fetch_targets();
        let mut slot = lock(&self.slot);
        if self.state() != ComponentState::Active {
            drop(slot);
            self.release(fetched.iter().map(|(_, bound)| bound));
            self.log(Severity::Warning, ACTIVATE_FAILED, None);
            return Ok(None);
        }
        if let Some(pair) = slot.as_ref() {
            let active = pair.active();
            drop(slot);
            self.release(fetched.iter().map(|(_, bound)| bound));
            return Ok(Some(active));
        }

        log::debug!("Activating component '{}' for module {}", self.name(), requester);
        match self.create_instance(fetched) {
            Ok(pair) => {
                let active = pair.active();
                *slot = Some(pair);
                Ok(Some(active))
            }
            Err(fault) => {
                self.log(
                    Severity::Error,
                    &format!("Failed to activate component '{}'", self.name()),
                    Some(&fault),
                );
                let mut state = lock(&self.state);
                if *state == ComponentState::Active {
                    *state = ComponentState::Satisfied;
                }
                if fault.is_propagated() { Err(fault) } else { Ok(None) }
            }
        }
    }

    /// Services the current targets of every reference resolve to. Called
    /// with no slot held.
    fn fetch_targets(&self) -> Vec<(String, BoundService)> {
        let mut fetched = Vec::new();
        for (manager, reference) in self.references.iter().zip(&self.metadata.references) {
            let targets = lock(manager).target_references();
            for target in &targets {
                if let Some(bound) = self.fetch(&reference.name, target) {
                    fetched.push((reference.name.clone(), bound));
                }
            }
        }
        fetched
    }

    fn fetch(&self, name: &str, reference: &ServiceReference) -> Option<BoundService> {
        match self.framework.services().get_service(self.module.info(), reference) {
            Ok(service) => Some(BoundService::new(reference.clone(), service)),
            Err(fault) => {
                self.log(
                    Severity::Error,
                    &format!("Could not obtain service {} for reference '{}' of '{}'", reference.id(), name, self.name()),
                    Some(&fault),
                );
                None
            }
        }
    }

    /// Give back services that were fetched but never bound.
    fn release<'a>(&self, unbound: impl Iterator<Item = &'a BoundService>) {
        for bound in unbound {
            self.framework.services().unget_service(self.module.info(), &bound.reference);
        }
    }

    fn create_instance(&self, fetched: Vec<(String, BoundService)>) -> Result<InstanceContextPair, Fault> {
        let constructed = self.module.implementation(&self.metadata.implementation).and_then(|factory| {
            let context = Arc::new(ComponentContext::new(
                self.metadata.references.iter().map(|r| r.name.clone()),
                self.properties(),
            ));
            let instance = fault::capture(|| factory(context.as_ref()))?;
            Ok((instance, context))
        });
        let (instance, context) = match constructed {
            Ok(constructed) => constructed,
            Err(fault) => {
                self.release(fetched.iter().map(|(_, bound)| bound));
                return Err(fault);
            }
        };
        let id = self.next_instance_id.fetch_add(1, Ordering::SeqCst);
        let mut pair = InstanceContextPair { id, instance, context };

        for (name, bound) in fetched {
            self.bind_into(&mut pair, &name, bound);
        }

        let InstanceContextPair { instance, context, .. } = &mut pair;
        if let Err(fault) = fault::capture(|| instance.activate(context)) {
            self.teardown(pair, false);
            return Err(fault);
        }
        Ok(pair)
    }

    fn bind_into(&self, pair: &mut InstanceContextPair, name: &str, bound: BoundService) {
        if !pair.context.add_to_bound_services_cache(name, bound.clone()) {
            self.log(Severity::Warning, BOUND_CACHE_FAILURE, None);
            self.release(std::iter::once(&bound));
            return;
        }
        let instance = &mut pair.instance;
        if let Err(fault) = fault::capture(|| instance.bind(name, &bound)) {
            self.log(
                Severity::Error,
                &format!("Bind of reference '{}' failed for component '{}'", name, self.name()),
                Some(&fault),
            );
        }
    }

    fn unbind_from(&self, pair: &mut InstanceContextPair, name: &str, reference: &ServiceReference) {
        let instance = &mut pair.instance;
        if let Err(fault) = fault::capture(|| instance.unbind(name, reference)) {
            self.log(
                Severity::Error,
                &format!("Unbind of reference '{}' failed for component '{}'", name, self.name()),
                Some(&fault),
            );
        }
        if pair.context.remove_from_bound_services_cache(name, reference).is_some() {
            self.framework.services().unget_service(self.module.info(), reference);
        }
    }

    fn teardown(&self, mut pair: InstanceContextPair, deactivate: bool) {
        if deactivate {
            let InstanceContextPair { instance, context, .. } = &mut pair;
            if let Err(fault) = fault::capture(|| instance.deactivate(context)) {
                self.log(
                    Severity::Error,
                    &format!("Deactivate failed for component '{}'", self.name()),
                    Some(&fault),
                );
            }
        }
        let bound: BTreeMap<String, Vec<BoundService>> = pair.context.bound_services();
        for (name, services) in &bound {
            for service in services.iter().rev() {
                self.unbind_from(&mut pair, name, &service.reference);
            }
        }
        pair.context.invalidate();
    }

    /// Deactivate and drop the live instance. No-op when there is none.
    pub fn destroy_component_instances(&self) {
        let mut slot = lock(&self.slot);
        let Some(pair) = slot.take() else {
            return;
        };
        log::debug!("Destroying instance {} of component '{}'", pair.id, self.name());
        self.teardown(pair, true);
        let mut state = lock(&self.state);
        if *state == ComponentState::Active {
            *state = ComponentState::Satisfied;
        }
    }

    /// Service-factory entry point for consumers of the provided services.
    ///
    /// A security fault disables every component of the module that owns the
    /// registration before it is returned.
    pub fn get_service(&self, requester: &ModuleInfo, registration: &ServiceReference) -> Result<Option<ServiceObject>, Fault> {
        match self.activate(requester) {
            Ok(active) => Ok(active.and_then(|active| active.service)),
            Err(fault) if fault.kind() == FaultKind::Security => {
                self.disable_module_components(registration.owner().id);
                Err(fault)
            }
            Err(fault) => Err(fault),
        }
    }

    fn disable_module_components(&self, owner: ModuleId) {
        let Some(components) = self.components.upgrade() else {
            return;
        };
        for manager in components.get_component_managers(owner) {
            if let Err(e) = manager.disable().wait() {
                self.report_disable_failure(manager.name(), &e);
            }
        }
    }

    pub(crate) fn report_disable_failure(&self, component: &str, error: &ComponentError) {
        let fault = Fault::from(error);
        self.log(Severity::Warning, &format!("{} {}", SECURITY_DISABLE_FAILURE, component), Some(&fault));
    }

    /// Consumers releasing the service never reset the instance.
    pub fn unget_service(&self, requester: &ModuleInfo, _registration: &ServiceReference) {
        log::trace!("Module {} released component '{}'", requester, self.name());
    }

    /// Bind `reference` under `name` on the live instance.
    pub fn bind_reference(&self, name: &str, reference: &ServiceReference) {
        let Some(bound) = self.fetch(name, reference) else {
            return;
        };
        let mut slot = lock(&self.slot);
        match slot.as_mut() {
            Some(pair) => self.bind_into(pair, name, bound),
            None => {
                drop(slot);
                self.release(std::iter::once(&bound));
            }
        }
    }

    /// Unbind `reference` from the live instance. The cache entry is removed
    /// even when the unbind hook faults.
    pub fn unbind_reference(&self, name: &str, reference: &ServiceReference) {
        let mut slot = lock(&self.slot);
        if let Some(pair) = slot.as_mut() {
            self.unbind_from(pair, name, reference);
        }
    }

    /// Push the current properties into the live instance. True only when an
    /// instance exists, supports modification, and accepted the change.
    pub fn modify_component_instance_properties(&self) -> bool {
        let mut slot = lock(&self.slot);
        let Some(pair) = slot.as_mut() else {
            return false;
        };
        if !pair.instance.supports_modified() {
            return false;
        }
        pair.context.set_properties(self.properties());
        let InstanceContextPair { instance, context, .. } = pair;
        match fault::capture(|| instance.modified(context)) {
            Ok(()) => true,
            Err(fault) => {
                self.log(
                    Severity::Error,
                    &format!("Modified failed for component '{}'", self.name()),
                    Some(&fault),
                );
                false
            }
        }
    }

    /// Replace the configuration properties. A live instance that cannot take
    /// them in place is recycled.
    pub fn update_properties(&self, properties: PropertyMap) {
        *write(&self.properties) = properties;
        let registered = lock(&self.registration).as_ref().map(ServiceRegistration::id);
        if let Some(id) = registered {
            self.framework.services().set_properties(id, self.properties());
        }
        if self.instance_id().is_some() && !self.modify_component_instance_properties() {
            self.destroy_component_instances();
            if self.metadata.is_immediate() {
                self.activate_eagerly();
            }
        }
    }
}
