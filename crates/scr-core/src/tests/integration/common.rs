#![cfg(test)]

use std::sync::{Arc, Mutex};

use crate::component::{BoundService, ComponentContext, ComponentInstance, ComponentMetadata, ServiceComponentRuntime};
use crate::framework::diagnostics::MemorySink;
use crate::framework::{Fault, Framework, FrameworkConfig, Module, ModuleDescriptor};
use crate::service::{Filter, PropertyMap, ServiceObject, ServiceReference, ServiceRegistration};

pub const TRACED: &str = "impl.Traced";

/// Ordered record of the hooks called on traced instances.
#[derive(Debug, Default, Clone)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Component implementation that traces its hooks, tagged with the
/// component name, and serves the value of its `P` property.
pub struct Traced {
    name: String,
    trace: Trace,
    object: ServiceObject,
}

impl Traced {
    fn value_of(context: &ComponentContext) -> String {
        context
            .property("P")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "-".to_string())
    }
}

impl ComponentInstance for Traced {
    fn activate(&mut self, context: &ComponentContext) -> Result<(), Fault> {
        self.trace.push(format!("{}: activate P={}", self.name, Self::value_of(context)));
        Ok(())
    }

    fn deactivate(&mut self, _context: &ComponentContext) -> Result<(), Fault> {
        self.trace.push(format!("{}: deactivate", self.name));
        Ok(())
    }

    fn bind(&mut self, reference: &str, service: &BoundService) -> Result<(), Fault> {
        self.trace.push(format!("{}: bind {} {}", self.name, reference, service.reference.id()));
        Ok(())
    }

    fn unbind(&mut self, reference: &str, service: &ServiceReference) -> Result<(), Fault> {
        self.trace.push(format!("{}: unbind {} {}", self.name, reference, service.id()));
        Ok(())
    }

    fn service(&self) -> Option<ServiceObject> {
        Some(self.object.clone())
    }
}

/// Module descriptor whose `impl.Traced` implementation builds traced instances.
pub fn traced_module(name: &str, components: Vec<ComponentMetadata>, trace: &Trace) -> ModuleDescriptor {
    let trace = trace.clone();
    components
        .into_iter()
        .fold(ModuleDescriptor::new(name), ModuleDescriptor::with_component)
        .with_implementation(TRACED, move |context| {
            let name = context
                .property("component.name")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let object: ServiceObject = Arc::new(Traced::value_of(context));
            Ok(Box::new(Traced { name, trace: trace.clone(), object }) as Box<dyn ComponentInstance>)
        })
}

pub struct Harness {
    pub framework: Framework,
    pub sink: Arc<MemorySink>,
    pub runtime: Arc<ServiceComponentRuntime>,
    pub trace: Trace,
    pub provider: Module,
}

impl Harness {
    /// A started framework with a runtime attached and an empty provider module.
    pub fn new() -> Self {
        let sink = Arc::new(MemorySink::new());
        let framework = Framework::with_sink(FrameworkConfig::default(), sink.clone());
        framework.start().unwrap();
        let runtime = ServiceComponentRuntime::new(&framework);
        let provider = framework.install(ModuleDescriptor::new("provider")).unwrap();
        provider.start().unwrap();
        Self { framework, sink, runtime, trace: Trace::default(), provider }
    }

    /// Install and start a traced module.
    pub fn start_module(&self, name: &str, components: Vec<ComponentMetadata>) -> Module {
        let module = self.framework.install(traced_module(name, components, &self.trace)).unwrap();
        module.start().unwrap();
        module
    }

    pub fn provide(&self, interface: &str, properties: PropertyMap) -> ServiceRegistration {
        self.provider
            .context()
            .unwrap()
            .register_service(interface, properties, Arc::new(format!("{} impl", interface)))
    }

    /// Request `interface` as the provider module.
    pub fn request(&self, interface: &str) -> Result<Option<ServiceObject>, Fault> {
        let reference = self
            .framework
            .services()
            .find_one(&Filter::for_interface(interface))
            .ok_or_else(|| Fault::runtime(format!("no {} registered", interface)))?;
        self.framework.services().get_service(self.provider.info(), &reference)
    }

    pub fn registered(&self, interface: &str) -> usize {
        self.framework.services().find(&Filter::for_interface(interface)).len()
    }
}
