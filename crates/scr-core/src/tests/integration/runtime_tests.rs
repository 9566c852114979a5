#![cfg(test)]

use crate::component::{ComponentError, ComponentMetadata, ComponentState, ReferenceMetadata, ServiceComponentRuntime};
use crate::service::PropertyMap;

use super::common::{traced_module, Harness, TRACED};

#[test]
fn test_description_dtos() {
    let harness = Harness::new();
    let module = harness.start_module(
        "m",
        vec![
            ComponentMetadata::new("clock", TRACED).providing("api.Clock").with_property("tz", "UTC"),
            ComponentMetadata::new("idle", TRACED).enabled(false),
        ],
    );

    let mut descriptions = harness.runtime.component_description_dtos();
    descriptions.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(descriptions.len(), 2);

    let clock = &descriptions[0];
    assert_eq!(clock.name, "clock");
    assert_eq!(&clock.module, module.info());
    assert_eq!(clock.service_interfaces, vec!["api.Clock".to_string()]);
    assert!(!clock.immediate);
    assert!(clock.enabled);
    assert_eq!(clock.properties.get("tz"), Some(&serde_json::Value::from("UTC")));

    let idle = &descriptions[1];
    assert!(!idle.default_enabled);
    assert!(!idle.enabled);
    assert!(harness.runtime.component_configuration_dtos("idle").is_empty());
}

#[test]
fn test_configuration_dto_json() {
    let harness = Harness::new();
    harness.start_module(
        "m",
        vec![ComponentMetadata::new("clock", TRACED)
            .providing("api.Clock")
            .with_reference(ReferenceMetadata::new("tick", "api.Tick"))],
    );

    let dtos = harness.runtime.all_configuration_dtos();
    assert_eq!(dtos.len(), 1);
    let json = serde_json::to_value(&dtos[0]).unwrap();
    assert_eq!(json["name"], "clock");
    assert_eq!(json["state"], "UNSATISFIED_REFERENCE");
    assert_eq!(json["module"]["name"], "m");
    assert_eq!(json["references"][0]["name"], "tick");
    assert_eq!(json["references"][0]["satisfied"], false);
    assert!(json.get("configuration_id").is_none());
    assert!(json.get("instance_id").is_none());
}

#[test]
fn test_enable_and_disable_by_name() {
    let harness = Harness::new();
    harness.start_module("m", vec![ComponentMetadata::new("idle", TRACED).enabled(false)]);
    assert_eq!(harness.trace.count("idle: activate"), 0);

    harness.runtime.enable_component("idle").unwrap().wait().unwrap();
    assert_eq!(harness.trace.count("idle: activate"), 1);
    assert_eq!(harness.runtime.component_configuration_dtos("idle")[0].state, ComponentState::Active);

    harness.runtime.disable_component("idle").unwrap().wait().unwrap();
    assert_eq!(harness.trace.count("idle: deactivate"), 1);
    assert!(harness.runtime.component_configuration_dtos("idle").is_empty());
}

#[test]
fn test_unknown_components_are_reported() {
    let harness = Harness::new();
    let unknown = ComponentError::UnknownComponent("nope".to_string());
    assert_eq!(harness.runtime.enable_component("nope").err(), Some(unknown.clone()));
    assert_eq!(harness.runtime.disable_component("nope").err(), Some(unknown.clone()));
    assert_eq!(harness.runtime.create_factory_configuration("nope", "x", PropertyMap::new()), Err(unknown));
}

#[test]
fn test_invalid_descriptions_are_skipped() {
    let harness = Harness::new();
    harness.start_module(
        "m",
        vec![
            ComponentMetadata::new("lazy", TRACED).immediate(false),
            ComponentMetadata::new("fine", TRACED),
            ComponentMetadata::new("fine", TRACED),
        ],
    );

    assert!(harness.runtime.find_manager("lazy").is_none());
    assert_eq!(harness.runtime.components().len(), 1);
    assert_eq!(harness.trace.count("fine: activate"), 1);
}

#[test]
fn test_runtime_picks_up_modules_that_are_already_active() {
    let harness = Harness::new();
    harness.runtime.shutdown();
    let module = harness
        .framework
        .install(traced_module("early", vec![ComponentMetadata::new("worker", TRACED)], &harness.trace))
        .unwrap();
    module.start().unwrap();
    assert_eq!(harness.trace.count("worker: activate"), 0, "a shut down runtime ignores modules");

    let late = ServiceComponentRuntime::new(&harness.framework);

    assert_eq!(late.components().len(), 1);
    assert_eq!(harness.trace.count("worker: activate"), 1);
}

#[test]
fn test_shutdown_disables_every_component() {
    let harness = Harness::new();
    harness.start_module("a", vec![ComponentMetadata::new("one", TRACED)]);
    harness.start_module("b", vec![ComponentMetadata::new("two", TRACED)]);

    harness.runtime.shutdown();

    assert!(harness.runtime.components().is_empty());
    assert_eq!(harness.trace.count("one: deactivate"), 1);
    assert_eq!(harness.trace.count("two: deactivate"), 1);
}
