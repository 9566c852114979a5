use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::event::types::{FrameworkEvent, ModuleEvent, OriginEvent, ServiceEvent};
use crate::event::Event;
use crate::framework::constants::FRAMEWORK_LISTENER_FAULT;
use crate::framework::diagnostics::{Severity, SharedSink};
use crate::framework::fault::{self, Fault};
use crate::service::Filter;
use crate::utils::sync::lock;

/// What a listener callback reports back. `Err` is contained by the dispatcher.
pub type ListenerResult = Result<(), Fault>;

/// Shared listener callback. Keep a clone to remove the listener by identity.
pub type Listener<E> = Arc<dyn Fn(&E) -> ListenerResult + Send + Sync>;

pub type FrameworkListener = Listener<FrameworkEvent>;
pub type ModuleListener = Listener<ModuleEvent>;
pub type ServiceListener = Listener<ServiceEvent>;

/// Opaque handle returned when a listener is added.
///
/// Tokens from before a framework stop are stale and remove nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken {
    id: u64,
    generation: u64,
}

impl ListenerToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

//--------------------------------------------------
// ListenerSet (Internal)
//--------------------------------------------------

struct Registration<E> {
    token: ListenerToken,
    callback: Listener<E>,
    filter: Option<Filter>,
    active: AtomicBool,
}

impl<E: Event> Registration<E> {
    fn wants(&self, event: &E) -> bool {
        self.active.load(Ordering::Acquire) && self.filter.as_ref().is_none_or(|filter| event.matches(filter))
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Listeners of one event kind, in registration order.
struct ListenerSet<E> {
    entries: Mutex<Vec<Arc<Registration<E>>>>,
}

impl<E: Event> ListenerSet<E> {
    fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }

    fn add(&self, registration: Registration<E>) {
        lock(&self.entries).push(Arc::new(registration));
    }

    /// Copy of the current registrations. The lock is released on return.
    fn snapshot(&self) -> Vec<Arc<Registration<E>>> {
        lock(&self.entries).clone()
    }

    fn remove_where(&self, predicate: impl Fn(&Registration<E>) -> bool) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|registration| {
            if predicate(registration) {
                registration.deactivate();
                false
            } else {
                true
            }
        });
        entries.len() < before
    }

    fn clear(&self) -> usize {
        let mut entries = lock(&self.entries);
        entries.iter().for_each(|registration| registration.deactivate());
        let released = entries.len();
        entries.clear();
        released
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Invoke every active listener from a snapshot, reporting each fault.
    fn deliver(&self, event: &E, mut on_fault: impl FnMut(Fault)) {
        for registration in self.snapshot() {
            // Removal may have happened after the snapshot was taken.
            if !registration.wants(event) {
                continue;
            }
            let callback = &registration.callback;
            if let Err(fault) = fault::capture(|| callback(event)) {
                on_fault(fault);
            }
        }
    }
}

//--------------------------------------------------
// EventDispatcher (Public API)
//--------------------------------------------------

/// Listener registry and synchronous event delivery.
///
/// Listener lists are only locked long enough to copy them; callbacks run
/// with no dispatcher lock held, so a listener may add or remove listeners or
/// trigger further events on any thread.
pub struct EventDispatcher {
    framework_listeners: ListenerSet<FrameworkEvent>,
    module_listeners: ListenerSet<ModuleEvent>,
    service_listeners: ListenerSet<ServiceEvent>,
    next_listener_id: AtomicU64,
    generation: AtomicU64,
    sink: SharedSink,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("framework_listeners", &self.framework_listeners.len())
            .field("module_listeners", &self.module_listeners.len())
            .field("service_listeners", &self.service_listeners.len())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

impl EventDispatcher {
    pub fn new(sink: SharedSink) -> Self {
        Self {
            framework_listeners: ListenerSet::new(),
            module_listeners: ListenerSet::new(),
            service_listeners: ListenerSet::new(),
            next_listener_id: AtomicU64::new(1),
            generation: AtomicU64::new(0),
            sink,
        }
    }

    fn next_token(&self) -> ListenerToken {
        ListenerToken {
            id: self.next_listener_id.fetch_add(1, Ordering::SeqCst),
            generation: self.generation.load(Ordering::SeqCst),
        }
    }

    fn register<E: Event>(&self, set: &ListenerSet<E>, callback: Listener<E>, filter: Option<Filter>) -> ListenerToken {
        let token = self.next_token();
        set.add(Registration { token, callback, filter, active: AtomicBool::new(true) });
        token
    }

    pub fn add_framework_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(&FrameworkEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.add_shared_framework_listener(Arc::new(listener))
    }

    pub fn add_shared_framework_listener(&self, listener: FrameworkListener) -> ListenerToken {
        self.register(&self.framework_listeners, listener, None)
    }

    /// Remove every registration of `listener` (by `Arc` identity).
    pub fn remove_framework_listener(&self, listener: &FrameworkListener) -> bool {
        self.framework_listeners.remove_where(|r| Arc::ptr_eq(&r.callback, listener))
    }

    pub fn add_module_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(&ModuleEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.add_shared_module_listener(Arc::new(listener))
    }

    pub fn add_shared_module_listener(&self, listener: ModuleListener) -> ListenerToken {
        self.register(&self.module_listeners, listener, None)
    }

    pub fn remove_module_listener(&self, listener: &ModuleListener) -> bool {
        self.module_listeners.remove_where(|r| Arc::ptr_eq(&r.callback, listener))
    }

    /// Add a service listener, optionally restricted by `filter`.
    pub fn add_service_listener<F>(&self, listener: F, filter: Option<Filter>) -> ListenerToken
    where
        F: Fn(&ServiceEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.add_shared_service_listener(Arc::new(listener), filter)
    }

    pub fn add_shared_service_listener(&self, listener: ServiceListener, filter: Option<Filter>) -> ListenerToken {
        self.register(&self.service_listeners, listener, filter)
    }

    pub fn remove_service_listener(&self, listener: &ServiceListener) -> bool {
        self.service_listeners.remove_where(|r| Arc::ptr_eq(&r.callback, listener))
    }

    /// Remove the listener registered under `token`, whatever its kind.
    pub fn remove_listener(&self, token: ListenerToken) -> bool {
        if token.generation != self.generation.load(Ordering::SeqCst) {
            return false;
        }
        self.framework_listeners.remove_where(|r| r.token == token)
            || self.module_listeners.remove_where(|r| r.token == token)
            || self.service_listeners.remove_where(|r| r.token == token)
    }

    /// Release every listener registration and invalidate outstanding tokens.
    pub fn clear(&self) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let released =
            self.framework_listeners.clear() + self.module_listeners.clear() + self.service_listeners.clear();
        log::debug!("Released {} listener registrations", released);
        released
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.framework_listeners.len() + self.module_listeners.len() + self.service_listeners.len()
    }

    /// Deliver to framework listeners. A faulting framework listener is
    /// reported to the diagnostics sink only; no further event is produced.
    pub fn fire_framework_event(&self, event: &FrameworkEvent) {
        self.framework_listeners.deliver(event, |fault| {
            self.sink.log(
                Severity::Error,
                &format!("{} {} (while delivering {})", FRAMEWORK_LISTENER_FAULT, fault, event.kind()),
                Some(&fault),
            );
        });
    }

    /// Deliver to module listeners. Each fault becomes a FRAMEWORK_ERROR.
    pub fn fire_module_event(&self, event: &ModuleEvent) {
        self.module_listeners.deliver(event, |fault| {
            let error = FrameworkEvent::error(event.module().clone(), fault, OriginEvent::Module(event.clone()));
            self.fire_framework_event(&error);
        });
    }

    /// Deliver to service listeners. Each fault becomes a FRAMEWORK_ERROR.
    pub fn fire_service_event(&self, event: &ServiceEvent) {
        self.service_listeners.deliver(event, |fault| {
            let source = event.reference().owner().clone();
            let error = FrameworkEvent::error(source, fault, OriginEvent::Service(event.clone()));
            self.fire_framework_event(&error);
        });
    }
}
