//! Manifest loading and the stub implementations used to run a manifest
//! outside of a real module.
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use scr_core::component::ComponentContext;
use scr_core::service::ServiceObject;
use scr_core::{ComponentError, ComponentInstance, ComponentMetadata, ModuleDescriptor};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read manifest '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Core(#[from] scr_core::Error),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<scr_core::framework::FrameworkError> for CliError {
    fn from(e: scr_core::framework::FrameworkError) -> Self {
        CliError::Core(e.into())
    }
}

/// A module's component descriptions, as written in a manifest file.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentMetadata>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let contents = fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_str(&contents).map_err(|source| CliError::Parse { path: path.to_path_buf(), source })
    }

    /// Validation problems for every component, plus duplicated names.
    pub fn problems(&self) -> Vec<ComponentError> {
        let mut seen = BTreeSet::new();
        let mut problems = Vec::new();
        for component in &self.components {
            if let Err(e) = component.validate() {
                problems.push(e);
            }
            if !seen.insert(component.name.as_str()) {
                problems.push(ComponentError::DuplicateComponent { module: 0, name: component.name.clone() });
            }
        }
        problems
    }

    /// A module descriptor whose implementations are all [`Stub`]s.
    pub fn into_descriptor(self) -> ModuleDescriptor {
        let implementations: BTreeSet<String> = self.components.iter().map(|c| c.implementation.clone()).collect();
        let descriptor = self
            .components
            .into_iter()
            .fold(ModuleDescriptor::new(self.name), ModuleDescriptor::with_component);
        implementations.into_iter().fold(descriptor, |descriptor, implementation| {
            descriptor.with_implementation(implementation, |context| Ok(Box::new(Stub::new(context)) as Box<dyn ComponentInstance>))
        })
    }
}

/// Stand-in implementation: logs its hooks and serves its component name.
pub struct Stub {
    name: String,
    object: ServiceObject,
}

impl Stub {
    fn new(context: &ComponentContext) -> Self {
        let name = context
            .property("component.name")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let object: ServiceObject = Arc::new(name.clone());
        Self { name, object }
    }
}

impl ComponentInstance for Stub {
    fn activate(&mut self, _context: &ComponentContext) -> Result<(), scr_core::Fault> {
        log::info!("Stub for '{}' activated", self.name);
        Ok(())
    }

    fn deactivate(&mut self, _context: &ComponentContext) -> Result<(), scr_core::Fault> {
        log::info!("Stub for '{}' deactivated", self.name);
        Ok(())
    }

    fn supports_modified(&self) -> bool {
        true
    }

    fn service(&self) -> Option<ServiceObject> {
        Some(self.object.clone())
    }
}
