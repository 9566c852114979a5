use std::sync::Arc;

use crate::component::context::{BoundService, ComponentContext};
use crate::framework::fault::Fault;
use crate::service::{ServiceObject, ServiceReference};

/// User implementation of a declared component.
///
/// Every hook has a no-op default. Hooks run with the configuration's
/// instance slot held; they may look up services and register listeners, but
/// must not wait on work that needs the same configuration.
pub trait ComponentInstance: Send {
    fn activate(&mut self, _context: &ComponentContext) -> Result<(), Fault> {
        Ok(())
    }

    fn deactivate(&mut self, _context: &ComponentContext) -> Result<(), Fault> {
        Ok(())
    }

    fn bind(&mut self, _reference: &str, _service: &BoundService) -> Result<(), Fault> {
        Ok(())
    }

    fn unbind(&mut self, _reference: &str, _service: &ServiceReference) -> Result<(), Fault> {
        Ok(())
    }

    /// Whether [`modified`](Self::modified) can take new properties without
    /// recycling the instance.
    fn supports_modified(&self) -> bool {
        false
    }

    fn modified(&mut self, _context: &ComponentContext) -> Result<(), Fault> {
        Ok(())
    }

    /// The object handed to consumers of the component's services.
    fn service(&self) -> Option<ServiceObject> {
        None
    }
}

/// Constructor for a component implementation, provided by the owning module.
pub type ImplementationFactory =
    Arc<dyn Fn(&ComponentContext) -> Result<Box<dyn ComponentInstance>, Fault> + Send + Sync>;
