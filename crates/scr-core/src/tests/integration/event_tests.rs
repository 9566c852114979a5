#![cfg(test)]

use std::sync::{Arc, Mutex};
use std::thread;

use crate::component::{ComponentMetadata, ComponentState, ReferenceMetadata};
use crate::event::{FrameworkEvent, FrameworkEventType, ModuleEventType, OriginEvent, ServiceEventType};
use crate::framework::constants::FRAMEWORK_LISTENER_FAULT;
use crate::framework::diagnostics::Severity;
use crate::framework::Fault;
use crate::service::{Filter, PropertyMap};

use super::common::{Harness, TRACED};

fn framework_errors(harness: &Harness) -> Arc<Mutex<Vec<FrameworkEvent>>> {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    harness.framework.add_framework_listener(move |event| {
        if event.kind() == FrameworkEventType::Error {
            sink.lock().unwrap().push(event.clone());
        }
        Ok(())
    });
    errors
}

#[test]
fn test_faulty_module_listener_does_not_stop_component_loading() {
    let harness = Harness::new();
    let errors = framework_errors(&harness);
    harness.framework.add_module_listener(|event| {
        if event.kind() == ModuleEventType::Started {
            return Err(Fault::runtime("module listener refused"));
        }
        Ok(())
    });

    let module = harness.start_module("m", vec![ComponentMetadata::new("worker", TRACED)]);

    assert_eq!(harness.trace.count("worker: activate"), 1);
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].source(), module.info());
    assert_eq!(errors[0].fault().map(Fault::message), Some("module listener refused"));
    match errors[0].origin() {
        Some(OriginEvent::Module(origin)) => assert_eq!(origin.kind(), ModuleEventType::Started),
        other => panic!("unexpected origin: {:?}", other),
    }
}

#[test]
fn test_panicking_service_listener_is_reported_once_per_event() {
    let harness = Harness::new();
    let errors = framework_errors(&harness);
    harness.framework.add_service_listener(
        |event| {
            if event.kind() == ServiceEventType::Registered {
                panic!("service listener crashed");
            }
            Ok(())
        },
        Some(Filter::for_interface("api.Clock")),
    );

    let module = harness.start_module("m", vec![ComponentMetadata::new("clock", TRACED).providing("api.Clock")]);

    assert_eq!(harness.registered("api.Clock"), 1);
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].source(), module.info(), "the registering module is the source");
    match errors[0].origin() {
        Some(OriginEvent::Service(origin)) => assert!(origin.reference().provides("api.Clock")),
        other => panic!("unexpected origin: {:?}", other),
    }
}

#[test]
fn test_faulty_framework_listener_is_logged_not_redelivered() {
    let harness = Harness::new();
    let errors = framework_errors(&harness);
    harness.framework.add_framework_listener(|event| {
        if event.kind() == FrameworkEventType::Started {
            return Err(Fault::runtime("framework listener refused"));
        }
        Ok(())
    });

    harness.framework.start().unwrap();

    assert!(errors.lock().unwrap().is_empty());
    let logged = harness.sink.matching(FRAMEWORK_LISTENER_FAULT);
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].severity, Severity::Error);
}

#[test]
fn test_activation_from_inside_a_service_listener() {
    let harness = Harness::new();
    let fetched = Arc::new(Mutex::new(None));
    let slot = fetched.clone();
    let services = Arc::downgrade(harness.framework.services());
    let requester = harness.provider.info().clone();
    harness.framework.add_service_listener(
        move |event| {
            if event.kind() == ServiceEventType::Registered {
                if let Some(services) = services.upgrade() {
                    let object = services.get_service(&requester, event.reference())?;
                    *slot.lock().unwrap() = object.and_then(|o| o.downcast::<String>().ok());
                }
            }
            Ok(())
        },
        Some(Filter::for_interface("api.Clock")),
    );

    harness.start_module("m", vec![ComponentMetadata::new("clock", TRACED).providing("api.Clock")]);

    assert_eq!(fetched.lock().unwrap().as_deref().map(String::as_str), Some("-"));
    assert_eq!(harness.runtime.component_configuration_dtos("clock")[0].state, ComponentState::Active);
}

#[test]
fn test_listener_may_register_services_from_a_joined_thread() {
    let harness = Harness::new();
    let services = Arc::downgrade(harness.framework.services());
    let owner = harness.provider.info().clone();
    let kept = Arc::new(Mutex::new(Vec::new()));
    let registrations = kept.clone();
    harness.framework.add_service_listener(
        move |event| {
            if event.kind() != ServiceEventType::Registered {
                return Ok(());
            }
            let services = services.clone();
            let owner = owner.clone();
            let helper = thread::spawn(move || {
                services.upgrade().map(|services| {
                    services.register_object(&owner, "api.Echo", PropertyMap::new(), Arc::new("echo".to_string()))
                })
            });
            let registration = helper.join().map_err(|_| Fault::runtime("helper thread panicked"))?;
            registrations.lock().unwrap().extend(registration);
            Ok(())
        },
        Some(Filter::for_interface("api.Clock")),
    );

    harness.start_module(
        "m",
        vec![
            ComponentMetadata::new("clock", TRACED).providing("api.Clock"),
            ComponentMetadata::new("listener", TRACED).with_reference(ReferenceMetadata::new("echo", "api.Echo")),
        ],
    );

    assert_eq!(kept.lock().unwrap().len(), 1);
    assert_eq!(harness.registered("api.Echo"), 1);
    assert_eq!(harness.trace.count("listener: activate"), 1);
    assert_eq!(harness.runtime.component_configuration_dtos("listener")[0].state, ComponentState::Active);
}
