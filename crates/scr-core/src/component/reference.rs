use crate::component::metadata::ReferenceMetadata;
use crate::event::{ServiceEvent, ServiceEventType};
use crate::service::{Filter, ServiceReference};

/// What one observed service event did to a reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceChange {
    /// New satisfaction, present only when it flipped.
    pub satisfaction: Option<bool>,
    /// A service that stopped matching.
    pub departed: Option<ServiceReference>,
    /// A service that started matching.
    pub arrived: Option<ServiceReference>,
}

impl ReferenceChange {
    pub fn is_empty(&self) -> bool {
        self.satisfaction.is_none() && self.departed.is_none() && self.arrived.is_none()
    }
}

/// What a live instance has to do after a [`ReferenceChange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingPlan {
    Keep,
    /// Destroy the instance and let it be activated again.
    Recycle,
    /// Unbind, then bind, in place.
    Rebind { unbind: Vec<ServiceReference>, bind: Vec<ServiceReference> },
}

/// Tracks the services matching one declared reference.
///
/// Matches are kept in selection order. The manager only changes when
/// [`update`](Self::update) observes a service event.
#[derive(Debug)]
pub struct ReferenceManager {
    metadata: ReferenceMetadata,
    filter: Filter,
    matches: Vec<ServiceReference>,
    satisfied: bool,
}

impl ReferenceManager {
    pub fn new(metadata: ReferenceMetadata) -> Self {
        let filter = metadata.filter();
        let satisfied = !metadata.cardinality.is_mandatory();
        Self { metadata, filter, matches: Vec::new(), satisfied }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn metadata(&self) -> &ReferenceMetadata {
        &self.metadata
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Current matches, best first.
    pub fn matches(&self) -> &[ServiceReference] {
        &self.matches
    }

    /// Seed the matching set from a registry lookup. Returns the satisfaction.
    pub fn initialize(&mut self, candidates: Vec<ServiceReference>) -> bool {
        self.matches = candidates.into_iter().filter(|r| self.filter.matches(r)).collect();
        self.matches.sort_by(|a, b| a.selection_order(b));
        self.satisfied = self.compute_satisfied();
        self.satisfied
    }

    /// Services an instance binds at activation: the best match for unary
    /// references, every match for multiple ones.
    pub fn target_references(&self) -> Vec<ServiceReference> {
        if self.metadata.cardinality.is_multiple() {
            self.matches.clone()
        } else {
            self.matches.iter().take(1).cloned().collect()
        }
    }

    fn compute_satisfied(&self) -> bool {
        self.matches.len() >= self.metadata.cardinality.minimum()
    }

    fn insert(&mut self, reference: ServiceReference) {
        let index = self
            .matches
            .partition_point(|existing| existing.selection_order(&reference).is_lt());
        self.matches.insert(index, reference);
    }

    fn remove(&mut self, reference: &ServiceReference) -> Option<ServiceReference> {
        let index = self.matches.iter().position(|r| r == reference)?;
        Some(self.matches.remove(index))
    }

    /// Apply a service event to the matching set.
    pub fn update(&mut self, event: &ServiceEvent) -> ReferenceChange {
        let reference = event.reference();
        let tracked = self.matches.contains(reference);
        let mut change = ReferenceChange::default();

        match event.kind() {
            ServiceEventType::Registered => {
                if !tracked && self.filter.matches(reference) {
                    self.insert(reference.clone());
                    change.arrived = Some(reference.clone());
                }
            }
            ServiceEventType::Modified => match (tracked, self.filter.matches(reference)) {
                (false, true) => {
                    self.insert(reference.clone());
                    change.arrived = Some(reference.clone());
                }
                (true, false) => change.departed = self.remove(reference),
                (true, true) => {
                    // Refresh the snapshot; the ranking may have moved.
                    self.remove(reference);
                    self.insert(reference.clone());
                }
                (false, false) => {}
            },
            ServiceEventType::Unregistering => {
                if tracked {
                    change.departed = self.remove(reference);
                }
            }
        }

        let satisfied = self.compute_satisfied();
        if satisfied != self.satisfied {
            self.satisfied = satisfied;
            change.satisfaction = Some(satisfied);
        }
        change
    }

    /// Decide how an instance currently bound to `bound` reacts to `change`.
    pub fn plan(&self, bound: &[ServiceReference], change: &ReferenceChange) -> BindingPlan {
        let departed = change.departed.as_ref().filter(|d| bound.contains(d));
        let multiple = self.metadata.cardinality.is_multiple();

        if !self.metadata.is_dynamic() {
            if departed.is_some() {
                return BindingPlan::Recycle;
            }
            return match &change.arrived {
                Some(arrived) if self.metadata.is_greedy() => {
                    let better = multiple || bound.first().is_none_or(|current| arrived.outranks(current));
                    if better { BindingPlan::Recycle } else { BindingPlan::Keep }
                }
                _ => BindingPlan::Keep,
            };
        }

        let mut unbind = Vec::new();
        let mut bind = Vec::new();

        if let Some(departed) = departed {
            unbind.push(departed.clone());
            if !multiple {
                if let Some(best) = self.matches.iter().find(|m| !bound.contains(m)) {
                    bind.push(best.clone());
                }
            }
        }

        if let Some(arrived) = &change.arrived {
            if multiple {
                if !bound.contains(arrived) {
                    bind.push(arrived.clone());
                }
            } else {
                match bound.iter().find(|b| !unbind.contains(b)) {
                    None if bind.is_empty() => bind.push(arrived.clone()),
                    Some(current) if self.metadata.is_greedy() && arrived.outranks(current) => {
                        unbind.push(current.clone());
                        bind.push(arrived.clone());
                    }
                    _ => {}
                }
            }
        }

        if unbind.is_empty() && bind.is_empty() {
            BindingPlan::Keep
        } else {
            BindingPlan::Rebind { unbind, bind }
        }
    }
}
