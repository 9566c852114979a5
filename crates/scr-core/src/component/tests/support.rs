//! Shared fixtures: a started framework with a consumer module whose single
//! implementation records every hook into a journal.
use std::sync::{Arc, Mutex};

use crate::component::{
    BoundService, ComponentConfiguration, ComponentContext, ComponentInstance, ComponentMetadata, ComponentRegistry,
    ConfigurationIdentity,
};
use crate::framework::diagnostics::MemorySink;
use crate::framework::{Fault, Framework, FrameworkConfig, Module, ModuleDescriptor, ModuleInfo};
use crate::service::{PropertyMap, ServiceObject, ServiceReference, ServiceRegistration};

pub const RECORDING: &str = "impl.Recording";

#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries.lock().unwrap().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Knobs for the recording implementation.
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    pub activate_fault: Option<Fault>,
    pub fail_bind: bool,
    pub panic_on_unbind: bool,
    pub modifiable: bool,
}

pub struct Recording {
    journal: Arc<Journal>,
    behavior: Behavior,
    label: String,
}

fn label_of(context: &ComponentContext) -> String {
    context
        .property("label")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

impl ComponentInstance for Recording {
    fn activate(&mut self, context: &ComponentContext) -> Result<(), Fault> {
        self.journal.push(format!("activate {}", label_of(context)));
        match &self.behavior.activate_fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }

    fn deactivate(&mut self, _context: &ComponentContext) -> Result<(), Fault> {
        self.journal.push("deactivate");
        Ok(())
    }

    fn bind(&mut self, reference: &str, service: &BoundService) -> Result<(), Fault> {
        self.journal.push(format!("bind {} {}", reference, service.reference.id()));
        if self.behavior.fail_bind {
            return Err(Fault::runtime("bind rejected"));
        }
        Ok(())
    }

    fn unbind(&mut self, reference: &str, service: &ServiceReference) -> Result<(), Fault> {
        self.journal.push(format!("unbind {} {}", reference, service.id()));
        if self.behavior.panic_on_unbind {
            panic!("unbind exploded");
        }
        Ok(())
    }

    fn supports_modified(&self) -> bool {
        self.behavior.modifiable
    }

    fn modified(&mut self, context: &ComponentContext) -> Result<(), Fault> {
        self.label = label_of(context);
        self.journal.push(format!("modified {}", self.label));
        Ok(())
    }

    fn service(&self) -> Option<ServiceObject> {
        Some(Arc::new(self.label.clone()))
    }
}

pub struct Fixture {
    pub framework: Framework,
    pub sink: Arc<MemorySink>,
    pub journal: Arc<Journal>,
    pub consumer: Module,
    pub provider: Module,
    pub components: Arc<ComponentRegistry>,
    metadata: Arc<ComponentMetadata>,
}

impl Fixture {
    pub fn new(metadata: ComponentMetadata) -> Self {
        Self::with_behavior(metadata, Behavior::default())
    }

    pub fn with_behavior(metadata: ComponentMetadata, behavior: Behavior) -> Self {
        let sink = Arc::new(MemorySink::new());
        let framework = Framework::with_sink(FrameworkConfig::default(), sink.clone());
        framework.start().unwrap();

        let journal = Arc::new(Journal::default());
        let shared = journal.clone();
        let descriptor = ModuleDescriptor::new("consumer")
            .with_component(metadata.clone())
            .with_implementation(RECORDING, move |context| {
                shared.push("construct");
                Ok(Box::new(Recording { journal: shared.clone(), behavior: behavior.clone(), label: label_of(context) })
                    as Box<dyn ComponentInstance>)
            });
        let consumer = framework.install(descriptor).unwrap();
        consumer.start().unwrap();
        let provider = framework.install(ModuleDescriptor::new("provider")).unwrap();
        provider.start().unwrap();

        Self {
            framework,
            sink,
            journal,
            consumer,
            provider,
            components: Arc::new(ComponentRegistry::new()),
            metadata: Arc::new(metadata),
        }
    }

    /// A singleton configuration, not yet enabled.
    pub fn configuration(&self, properties: PropertyMap) -> Arc<ComponentConfiguration> {
        ComponentConfiguration::new(
            ConfigurationIdentity::Singleton { component_id: 1 },
            self.metadata.clone(),
            self.consumer.clone(),
            self.framework.clone(),
            Arc::downgrade(&self.components),
            properties,
        )
    }

    /// A configuration that is already enabled.
    pub fn enabled(&self) -> Arc<ComponentConfiguration> {
        let configuration = self.configuration(PropertyMap::new());
        configuration.enable();
        configuration
    }

    pub fn provide(&self, interface: &str, ranking: i64) -> ServiceRegistration {
        let mut properties = PropertyMap::new();
        properties.insert("service.ranking".to_string(), ranking.into());
        self.provider
            .context()
            .unwrap()
            .register_service(interface, properties, Arc::new(interface.to_string()))
    }

    pub fn requester(&self) -> ModuleInfo {
        self.provider.info().clone()
    }
}

pub fn properties(pairs: &[(&str, &str)]) -> PropertyMap {
    pairs.iter().map(|(k, v)| (k.to_string(), serde_json::Value::from(*v))).collect()
}
