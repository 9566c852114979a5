use serde::{Deserialize, Serialize};

use crate::service::reference::ServiceReference;
use crate::service::PropertyMap;

/// Service selection criteria: an optional interface name plus property
/// equality constraints.
///
/// A property constraint matches when the service property equals the
/// expected value, or when the service property is an array containing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    interface: Option<String>,
    #[serde(default)]
    properties: PropertyMap,
}

impl Filter {
    /// A filter matching every service.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn for_interface(interface: impl Into<String>) -> Self {
        Self { interface: Some(interface.into()), properties: PropertyMap::new() }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: &PropertyMap) -> Self {
        self.properties.extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    pub fn matches(&self, reference: &ServiceReference) -> bool {
        if let Some(interface) = &self.interface {
            if !reference.provides(interface) {
                return false;
            }
        }
        self.properties.iter().all(|(key, expected)| match reference.property(key) {
            Some(actual) => {
                actual == expected
                    || matches!(actual, serde_json::Value::Array(values) if values.contains(expected))
            }
            None => false,
        })
    }
}
