#![cfg(test)]

use crate::component::{Cardinality, ComponentMetadata, ComponentState, ReferenceMetadata, ReferencePolicy};
use crate::service::PropertyMap;

use super::common::{Harness, TRACED};

fn p(value: &str) -> PropertyMap {
    let mut properties = PropertyMap::new();
    properties.insert("P".to_string(), value.into());
    properties
}

fn state_of(harness: &Harness, name: &str) -> Vec<ComponentState> {
    harness
        .runtime
        .component_configuration_dtos(name)
        .into_iter()
        .map(|dto| dto.state)
        .collect()
}

#[test]
fn test_factory_configuration_activates_with_its_properties() {
    let harness = Harness::new();
    let widget = ComponentMetadata::new("widget", TRACED)
        .providing("api.Widget")
        .factory(true)
        .with_reference(ReferenceMetadata::new("store", "api.Store"));
    harness.start_module("widgets", vec![widget]);

    let id = harness.runtime.create_factory_configuration("widget", "first", p("v1")).unwrap();
    assert_eq!(id, "widget~first");
    assert_eq!(state_of(&harness, "widget"), vec![ComponentState::UnsatisfiedReference]);
    assert_eq!(harness.registered("api.Widget"), 0);

    let store = harness.provide("api.Store", PropertyMap::new());
    assert_eq!(state_of(&harness, "widget"), vec![ComponentState::Satisfied]);
    assert_eq!(harness.registered("api.Widget"), 1);

    let object = harness.request("api.Widget").unwrap().unwrap();
    assert_eq!(object.downcast::<String>().ok().as_deref().map(String::as_str), Some("v1"));
    assert_eq!(state_of(&harness, "widget"), vec![ComponentState::Active]);
    assert_eq!(
        harness.trace.entries(),
        vec![format!("widget: bind store {}", store.id()), "widget: activate P=v1".to_string()]
    );

    let dto = &harness.runtime.component_configuration_dtos("widget")[0];
    assert_eq!(dto.configuration_id.as_deref(), Some("widget~first"));
    assert_eq!(dto.instance_id, Some(1));
    assert_eq!(dto.properties.get("component.factory.pid"), Some(&serde_json::Value::from("widget~first")));
}

#[test]
fn test_factory_configurations_activate_independently() {
    let harness = Harness::new();
    harness.start_module("widgets", vec![ComponentMetadata::new("widget", TRACED).providing("api.Widget").factory(true)]);
    harness.runtime.create_factory_configuration("widget", "a", p("a")).unwrap();
    harness.runtime.create_factory_configuration("widget", "b", p("b")).unwrap();
    assert_eq!(harness.registered("api.Widget"), 2);

    harness.request("api.Widget").unwrap();

    let mut states = state_of(&harness, "widget");
    states.sort_by_key(|s| format!("{}", s));
    assert_eq!(states, vec![ComponentState::Active, ComponentState::Satisfied]);
    assert_eq!(harness.trace.count("widget: activate"), 1);
}

#[test]
fn test_delayed_singleton_is_shared_and_survives_unget() {
    let harness = Harness::new();
    harness.start_module("m", vec![ComponentMetadata::new("clock", TRACED).providing("api.Clock")]);

    let first = harness.request("api.Clock").unwrap().unwrap();
    let second = harness.request("api.Clock").unwrap().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    let reference = harness
        .framework
        .services()
        .find_one(&crate::service::Filter::for_interface("api.Clock"))
        .unwrap();
    harness.framework.services().unget_service(harness.provider.info(), &reference);

    assert_eq!(harness.trace.count("clock: activate"), 1);
    assert_eq!(harness.trace.count("clock: deactivate"), 0);
    assert_eq!(state_of(&harness, "clock"), vec![ComponentState::Active]);
}

#[test]
fn test_immediate_component_follows_its_dependency() {
    let harness = Harness::new();
    let reporter = ComponentMetadata::new("reporter", TRACED).with_reference(ReferenceMetadata::new("sink", "api.Sink"));
    harness.start_module("m", vec![reporter]);
    assert_eq!(harness.trace.count("reporter: activate"), 0);

    let sink = harness.provide("api.Sink", PropertyMap::new());
    assert_eq!(harness.trace.count("reporter: activate"), 1);
    assert_eq!(state_of(&harness, "reporter"), vec![ComponentState::Active]);

    sink.unregister();
    assert_eq!(harness.trace.count("reporter: deactivate"), 1);
    assert_eq!(state_of(&harness, "reporter"), vec![ComponentState::UnsatisfiedReference]);

    // Satisfied again: a fresh instance.
    harness.provide("api.Sink", PropertyMap::new());
    assert_eq!(harness.trace.count("reporter: activate"), 2);
    assert_eq!(harness.runtime.component_configuration_dtos("reporter")[0].instance_id, Some(2));
}

#[test]
fn test_component_chain_wires_through_the_registry() {
    let harness = Harness::new();
    let store = ComponentMetadata::new("store", TRACED).providing("api.Store");
    let front = ComponentMetadata::new("front", TRACED).with_reference(ReferenceMetadata::new("store", "api.Store"));
    harness.start_module("app", vec![store, front]);

    // The immediate consumer pulled the delayed provider into existence.
    assert_eq!(state_of(&harness, "store"), vec![ComponentState::Active]);
    assert_eq!(state_of(&harness, "front"), vec![ComponentState::Active]);
    let entries = harness.trace.entries();
    let store_activated = entries.iter().position(|e| e == "store: activate P=-").unwrap();
    let front_activated = entries.iter().position(|e| e == "front: activate P=-").unwrap();
    assert!(store_activated < front_activated);
}

#[test]
fn test_dynamic_multiple_reference_tracks_services_without_recycling() {
    let harness = Harness::new();
    let hub = ComponentMetadata::new("hub", TRACED).with_reference(
        ReferenceMetadata::new("plugins", "api.Plugin")
            .with_cardinality(Cardinality::Multiple)
            .with_policy(ReferencePolicy::Dynamic),
    );
    harness.start_module("m", vec![hub]);

    let a = harness.provide("api.Plugin", PropertyMap::new());
    let b = harness.provide("api.Plugin", PropertyMap::new());
    a.unregister();
    b.unregister();

    assert_eq!(harness.trace.count("hub: activate"), 1);
    assert_eq!(harness.trace.count("hub: bind plugins"), 2);
    assert_eq!(harness.trace.count("hub: unbind plugins"), 2);
    assert_eq!(harness.trace.count("hub: deactivate"), 0);
    let states = harness.runtime.component_configuration_dtos("hub")[0].references.clone();
    assert!(states[0].bound.is_empty());
}

#[test]
fn test_static_reference_rebuilds_instance_on_departure() {
    let harness = Harness::new();
    let reporter = ComponentMetadata::new("reporter", TRACED).with_reference(ReferenceMetadata::new("sink", "api.Sink"));
    harness.start_module("m", vec![reporter]);
    let first = harness.provide("api.Sink", PropertyMap::new());
    let second = harness.provide("api.Sink", PropertyMap::new());

    first.unregister();

    assert_eq!(harness.trace.count("reporter: deactivate"), 1);
    assert_eq!(harness.trace.count("reporter: activate"), 2);
    let dto = &harness.runtime.component_configuration_dtos("reporter")[0];
    assert_eq!(dto.state, ComponentState::Active);
    assert_eq!(dto.references[0].bound, vec![second.id()]);
}

#[test]
fn test_module_stop_retires_components() {
    let harness = Harness::new();
    let module = harness.start_module(
        "m",
        vec![
            ComponentMetadata::new("worker", TRACED),
            ComponentMetadata::new("clock", TRACED).providing("api.Clock"),
        ],
    );
    assert_eq!(harness.runtime.components().len(), 2);
    harness.request("api.Clock").unwrap();

    module.stop().unwrap();

    assert!(harness.runtime.components().is_empty());
    assert_eq!(harness.registered("api.Clock"), 0);
    assert_eq!(harness.trace.count("worker: deactivate"), 1);
    assert_eq!(harness.trace.count("clock: deactivate"), 1);

    // Restarting the module brings the components back.
    module.start().unwrap();
    assert_eq!(harness.runtime.components().len(), 2);
    assert_eq!(harness.trace.count("worker: activate"), 2);
}

#[test]
fn test_framework_stop_retires_everything() {
    let harness = Harness::new();
    harness.start_module("m", vec![ComponentMetadata::new("worker", TRACED)]);

    harness.framework.stop().unwrap();

    assert_eq!(harness.trace.count("worker: deactivate"), 1);
    assert!(harness.runtime.components().is_empty());
    assert!(harness.framework.services().is_empty());
}
