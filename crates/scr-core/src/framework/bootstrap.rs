use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;

use crate::event::{
    EventDispatcher, FrameworkEvent, FrameworkEventType, ListenerResult, ListenerToken, ModuleEvent, ModuleEventType,
    ServiceEvent,
};
use crate::framework::config::FrameworkConfig;
use crate::framework::constants;
use crate::framework::diagnostics::{GatedSink, LogSink, Severity, SharedSink};
use crate::framework::error::FrameworkError;
use crate::framework::module::{Module, ModuleDescriptor, ModuleId, ModuleInfo, ModuleState};
use crate::service::{Filter, ServiceRegistry};
use crate::utils::sync::{lock, read, write};

/// Framework lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameworkState {
    Installed,
    /// Initialized; event handling is enabled but the framework is not active yet.
    Starting,
    Active,
    Stopping,
    /// Stopped. The framework may be started again.
    Resolved,
}

impl FrameworkState {
    fn is_running(self) -> bool {
        matches!(self, FrameworkState::Starting | FrameworkState::Active | FrameworkState::Stopping)
    }
}

pub(crate) struct FrameworkInner {
    config: FrameworkConfig,
    state: Mutex<FrameworkState>,
    stopped: Condvar,
    stop_event: Mutex<Option<FrameworkEvent>>,
    pub(crate) dispatcher: Arc<EventDispatcher>,
    pub(crate) services: Arc<ServiceRegistry>,
    modules: RwLock<BTreeMap<ModuleId, Module>>,
    next_module_id: AtomicU64,
    sink: SharedSink,
    system: ModuleInfo,
}

impl FrameworkInner {
    fn state(&self) -> FrameworkState {
        *lock(&self.state)
    }

    pub(crate) fn ensure_running(&self, operation: &'static str) -> Result<(), FrameworkError> {
        match self.state() {
            FrameworkState::Starting | FrameworkState::Active => Ok(()),
            state => Err(FrameworkError::InvalidState { operation, state }),
        }
    }

    pub(crate) fn forget_module(&self, id: ModuleId) {
        write(&self.modules).remove(&id);
    }

    fn event(&self, kind: FrameworkEventType, message: &str) -> FrameworkEvent {
        FrameworkEvent::new(kind, self.system.clone(), message)
    }
}

/// The framework: lifecycle, installed modules, the service registry and the
/// event dispatcher shared by all of them.
///
/// `Framework` is a cheap handle; clones refer to the same framework.
#[derive(Clone)]
pub struct Framework {
    inner: Arc<FrameworkInner>,
}

impl fmt::Debug for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framework")
            .field("state", &self.state())
            .field("modules", &read(&self.inner.modules).len())
            .field("services", &self.inner.services.len())
            .finish()
    }
}

impl Framework {
    /// Create a framework that reports diagnostics through the `log` crate.
    pub fn new(config: FrameworkConfig) -> Self {
        Self::with_sink(config, Arc::new(LogSink))
    }

    /// Create a framework that reports diagnostics to `sink`.
    pub fn with_sink(config: FrameworkConfig, sink: SharedSink) -> Self {
        let sink: SharedSink = Arc::new(GatedSink::new(sink, config.log_enabled));
        let dispatcher = Arc::new(EventDispatcher::new(sink.clone()));
        let services = Arc::new(ServiceRegistry::new(dispatcher.clone()));
        Self {
            inner: Arc::new(FrameworkInner {
                config,
                state: Mutex::new(FrameworkState::Installed),
                stopped: Condvar::new(),
                stop_event: Mutex::new(None),
                dispatcher,
                services,
                modules: RwLock::new(BTreeMap::new()),
                next_module_id: AtomicU64::new(1),
                sink,
                system: ModuleInfo::new(0, constants::SYSTEM_MODULE_NAME),
            }),
        }
    }

    pub fn state(&self) -> FrameworkState {
        self.inner.state()
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.inner.config
    }

    /// A framework property from the launch configuration.
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.inner.config.properties.get(key)
    }

    /// Identity used as the source of framework-level events.
    pub fn system_module(&self) -> &ModuleInfo {
        &self.inner.system
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.inner.dispatcher
    }

    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.inner.services
    }

    /// The diagnostics sink, gated by `log_enabled`.
    pub fn sink(&self) -> &SharedSink {
        &self.inner.sink
    }

    /// Move to STARTING. No-op when already starting or active.
    pub fn init(&self) -> Result<(), FrameworkError> {
        let mut state = lock(&self.inner.state);
        let current = *state;
        match current {
            FrameworkState::Installed | FrameworkState::Resolved => {
                *state = FrameworkState::Starting;
                drop(state);
                *lock(&self.inner.stop_event) = None;
                self.inner.sink.log(Severity::Info, "Framework initialized", None);
                Ok(())
            }
            FrameworkState::Starting | FrameworkState::Active => Ok(()),
            FrameworkState::Stopping => Err(FrameworkError::InvalidState { operation: "init", state: current }),
        }
    }

    /// Move to ACTIVE and announce FRAMEWORK_STARTED.
    ///
    /// Every call fires exactly one FRAMEWORK_STARTED, including calls on a
    /// framework that is already active.
    pub fn start(&self) -> Result<(), FrameworkError> {
        self.init()?;
        {
            let mut state = lock(&self.inner.state);
            if *state == FrameworkState::Stopping {
                return Err(FrameworkError::InvalidState { operation: "start", state: *state });
            }
            *state = FrameworkState::Active;
        }
        log::info!("Framework started");
        self.inner
            .dispatcher
            .fire_framework_event(&self.inner.event(FrameworkEventType::Started, "Framework Started"));
        Ok(())
    }

    /// Stop every active module in reverse install order, unregister the
    /// remaining services and release all listeners.
    ///
    /// Listener tokens handed out before the stop are stale afterwards.
    pub fn stop(&self) -> Result<(), FrameworkError> {
        {
            let mut state = lock(&self.inner.state);
            match *state {
                FrameworkState::Starting | FrameworkState::Active => *state = FrameworkState::Stopping,
                _ => return Ok(()),
            }
        }
        log::info!("Stopping framework");

        let modules: Vec<Module> = read(&self.inner.modules).values().rev().cloned().collect();
        for module in modules {
            if module.state() == ModuleState::Active {
                if let Err(e) = module.stop() {
                    log::warn!("Failed to stop module {}: {}", module.info(), e);
                }
            }
        }

        let leftover = self.inner.services.clear();
        if leftover > 0 {
            log::debug!("Unregistered {} services at framework stop", leftover);
        }

        let stopped = self.inner.event(FrameworkEventType::Stopped, "Framework Stopped");
        self.inner.dispatcher.fire_framework_event(&stopped);
        self.inner.dispatcher.clear();

        *lock(&self.inner.stop_event) = Some(stopped);
        *lock(&self.inner.state) = FrameworkState::Resolved;
        self.inner.stopped.notify_all();
        log::info!("Framework stopped");
        Ok(())
    }

    /// Block until the framework stops or `timeout` elapses.
    ///
    /// `Duration::ZERO` waits indefinitely. A framework that is not running
    /// returns immediately with FRAMEWORK_STOPPED.
    pub fn wait_for_stop(&self, timeout: Duration) -> FrameworkEvent {
        let state = lock(&self.inner.state);
        let running = |state: &mut FrameworkState| state.is_running();
        if timeout.is_zero() {
            let _state = self.inner.stopped.wait_while(state, running).unwrap_or_else(PoisonError::into_inner);
        } else {
            let (_state, result) = self
                .inner
                .stopped
                .wait_timeout_while(state, timeout, running)
                .unwrap_or_else(PoisonError::into_inner);
            if result.timed_out() {
                return self.inner.event(FrameworkEventType::WaitTimedOut, "Timed out waiting for framework stop");
            }
        }
        lock(&self.inner.stop_event)
            .clone()
            .unwrap_or_else(|| self.inner.event(FrameworkEventType::Stopped, "Framework Stopped"))
    }

    /// Install a module. Module names are unique; ids start at 1.
    pub fn install(&self, descriptor: ModuleDescriptor) -> Result<Module, FrameworkError> {
        let module = {
            let mut modules = write(&self.inner.modules);
            if let Some(existing) = modules.values().find(|m| m.name() == descriptor.name) {
                return Err(FrameworkError::DuplicateModule { name: descriptor.name, id: existing.id() });
            }
            let id = self.inner.next_module_id.fetch_add(1, Ordering::SeqCst);
            let module = Module::new(id, descriptor, Arc::downgrade(&self.inner));
            modules.insert(id, module.clone());
            module
        };
        log::debug!("Installed module {}", module.info());
        self.inner
            .dispatcher
            .fire_module_event(&ModuleEvent::new(ModuleEventType::Installed, module.info().clone()));
        Ok(module)
    }

    pub fn module(&self, id: ModuleId) -> Result<Module, FrameworkError> {
        read(&self.inner.modules).get(&id).cloned().ok_or(FrameworkError::ModuleNotFound(id))
    }

    pub fn find_module(&self, name: &str) -> Option<Module> {
        read(&self.inner.modules).values().find(|m| m.name() == name).cloned()
    }

    /// Installed modules in install order.
    pub fn modules(&self) -> Vec<Module> {
        read(&self.inner.modules).values().cloned().collect()
    }

    pub fn add_framework_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(&FrameworkEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.inner.dispatcher.add_framework_listener(listener)
    }

    pub fn add_module_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(&ModuleEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.inner.dispatcher.add_module_listener(listener)
    }

    pub fn add_service_listener<F>(&self, listener: F, filter: Option<Filter>) -> ListenerToken
    where
        F: Fn(&ServiceEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.inner.dispatcher.add_service_listener(listener, filter)
    }

    pub fn remove_listener(&self, token: ListenerToken) -> bool {
        self.inner.dispatcher.remove_listener(token)
    }
}
