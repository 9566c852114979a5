use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::framework::constants;
use crate::framework::module::ModuleInfo;
use crate::service::PropertyMap;

/// Registry-assigned service identifier. Ids are never reused.
pub type ServiceId = u64;

/// Cheap, clonable handle describing one registered service.
///
/// Two references are equal when they name the same service id, even if one
/// of them carries an older property snapshot.
#[derive(Clone)]
pub struct ServiceReference {
    inner: Arc<ReferenceData>,
}

struct ReferenceData {
    id: ServiceId,
    interfaces: Vec<String>,
    properties: PropertyMap,
    ranking: i64,
    owner: ModuleInfo,
}

impl ServiceReference {
    pub(crate) fn new(id: ServiceId, interfaces: Vec<String>, mut properties: PropertyMap, owner: ModuleInfo) -> Self {
        properties.insert(constants::SERVICE_ID.to_string(), id.into());
        properties.insert(
            constants::OBJECT_CLASS.to_string(),
            serde_json::Value::Array(interfaces.iter().cloned().map(serde_json::Value::from).collect()),
        );
        let ranking = properties
            .get(constants::SERVICE_RANKING)
            .and_then(|value| value.as_i64())
            .unwrap_or(0);
        Self {
            inner: Arc::new(ReferenceData { id, interfaces, properties, ranking, owner }),
        }
    }

    /// Same service, new property snapshot.
    pub(crate) fn with_properties(&self, properties: PropertyMap) -> Self {
        Self::new(self.inner.id, self.inner.interfaces.clone(), properties, self.inner.owner.clone())
    }

    pub fn id(&self) -> ServiceId {
        self.inner.id
    }

    pub fn interfaces(&self) -> &[String] {
        &self.inner.interfaces
    }

    pub fn provides(&self, interface: &str) -> bool {
        self.inner.interfaces.iter().any(|i| i == interface)
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.inner.properties
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.inner.properties.get(key)
    }

    pub fn ranking(&self) -> i64 {
        self.inner.ranking
    }

    /// The module that registered this service.
    pub fn owner(&self) -> &ModuleInfo {
        &self.inner.owner
    }

    /// Selection order: highest ranking first, then lowest (oldest) id.
    pub fn selection_order(&self, other: &Self) -> Ordering {
        other
            .ranking()
            .cmp(&self.ranking())
            .then_with(|| self.id().cmp(&other.id()))
    }

    /// True when this reference would be selected before `other`.
    pub fn outranks(&self, other: &Self) -> bool {
        self.selection_order(other) == Ordering::Less
    }
}

impl PartialEq for ServiceReference {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ServiceReference {}

impl Hash for ServiceReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceReference")
            .field("id", &self.inner.id)
            .field("interfaces", &self.inner.interfaces)
            .field("ranking", &self.inner.ranking)
            .field("owner", &self.inner.owner.name)
            .finish()
    }
}
