use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::error::ComponentError;
use crate::service::{Filter, PropertyMap};

/// How many matching services a reference needs and may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "0..1")]
    Optional,
    #[default]
    #[serde(rename = "1..1")]
    Mandatory,
    #[serde(rename = "0..n")]
    Multiple,
    #[serde(rename = "1..n")]
    AtLeastOne,
}

impl Cardinality {
    pub fn is_mandatory(self) -> bool {
        matches!(self, Cardinality::Mandatory | Cardinality::AtLeastOne)
    }

    pub fn is_multiple(self) -> bool {
        matches!(self, Cardinality::Multiple | Cardinality::AtLeastOne)
    }

    /// Minimum number of matches for the reference to be satisfied.
    pub fn minimum(self) -> usize {
        usize::from(self.is_mandatory())
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Cardinality::Optional => "0..1",
            Cardinality::Mandatory => "1..1",
            Cardinality::Multiple => "0..n",
            Cardinality::AtLeastOne => "1..n",
        };
        f.write_str(text)
    }
}

/// Whether a bound service can change while the component is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Any change to the bound services recycles the instance.
    #[default]
    Static,
    /// Bound services are swapped in place through bind/unbind.
    Dynamic,
}

/// Whether a better service arriving later replaces the bound one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyOption {
    #[default]
    Reluctant,
    Greedy,
}

/// A declared dependency of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    pub name: String,
    pub interface: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub policy: ReferencePolicy,
    #[serde(default)]
    pub policy_option: PolicyOption,
    /// Property constraints a service must meet, on top of the interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PropertyMap>,
}

impl ReferenceMetadata {
    pub fn new(name: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface: interface.into(),
            cardinality: Cardinality::default(),
            policy: ReferencePolicy::default(),
            policy_option: PolicyOption::default(),
            target: None,
        }
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_policy_option(mut self, option: PolicyOption) -> Self {
        self.policy_option = option;
        self
    }

    pub fn with_target(mut self, target: PropertyMap) -> Self {
        self.target = Some(target);
        self
    }

    /// Filter selecting candidate services for this reference.
    pub fn filter(&self) -> Filter {
        let filter = Filter::for_interface(self.interface.clone());
        match &self.target {
            Some(target) => filter.with_properties(target),
            None => filter,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.policy == ReferencePolicy::Dynamic
    }

    pub fn is_greedy(&self) -> bool {
        self.policy_option == PolicyOption::Greedy
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Immutable description of a declared component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub name: String,
    /// Key of the implementation constructor in the owning module.
    pub implementation: String,
    #[serde(default)]
    pub service_interfaces: Vec<String>,
    /// Activate as soon as satisfied. Defaults to true for components that
    /// provide no service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immediate: Option<bool>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Configurations are created on demand through factory configurations.
    #[serde(default)]
    pub factory: bool,
    #[serde(default)]
    pub references: Vec<ReferenceMetadata>,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl ComponentMetadata {
    pub fn new(name: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implementation: implementation.into(),
            service_interfaces: Vec::new(),
            immediate: None,
            enabled: true,
            factory: false,
            references: Vec::new(),
            properties: PropertyMap::new(),
        }
    }

    pub fn providing(mut self, interface: impl Into<String>) -> Self {
        self.service_interfaces.push(interface.into());
        self
    }

    pub fn with_reference(mut self, reference: ReferenceMetadata) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = Some(immediate);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn factory(mut self, factory: bool) -> Self {
        self.factory = factory;
        self
    }

    pub fn provides_service(&self) -> bool {
        !self.service_interfaces.is_empty()
    }

    pub fn is_immediate(&self) -> bool {
        self.immediate.unwrap_or(!self.provides_service())
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceMetadata> {
        self.references.iter().find(|r| r.name == name)
    }

    /// Check the description for internal consistency.
    pub fn validate(&self) -> Result<(), ComponentError> {
        let invalid = |reason: String| ComponentError::InvalidMetadata { component: self.name.clone(), reason };

        if self.name.trim().is_empty() {
            return Err(invalid("component name is empty".to_string()));
        }
        if self.implementation.trim().is_empty() {
            return Err(invalid("implementation name is empty".to_string()));
        }
        if self.service_interfaces.iter().any(|i| i.trim().is_empty()) {
            return Err(invalid("service interface name is empty".to_string()));
        }
        if !self.provides_service() && self.immediate == Some(false) {
            return Err(invalid("a component that provides no service must be immediate".to_string()));
        }
        if self.factory && self.immediate == Some(true) {
            return Err(invalid("a factory component cannot be immediate".to_string()));
        }

        let mut seen = HashSet::new();
        for reference in &self.references {
            if reference.name.trim().is_empty() {
                return Err(invalid("reference name is empty".to_string()));
            }
            if reference.interface.trim().is_empty() {
                return Err(invalid(format!("reference '{}' has no interface", reference.name)));
            }
            if !seen.insert(reference.name.as_str()) {
                return Err(invalid(format!("reference '{}' is declared twice", reference.name)));
            }
        }
        Ok(())
    }
}
