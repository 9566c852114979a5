#![cfg(test)]

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::component::{ComponentInstance, ComponentMetadata, ComponentState, ReferenceMetadata};
use crate::framework::diagnostics::Severity;
use crate::framework::{Fault, FaultKind};
use crate::service::Filter;

use super::common::{traced_module, Harness, TRACED};

fn guarded(harness: &Harness) {
    let descriptor = traced_module(
        "guarded",
        vec![
            ComponentMetadata::new("vault", "impl.Denied").providing("api.Vault"),
            ComponentMetadata::new("watcher", TRACED),
        ],
        &harness.trace,
    )
    .with_implementation("impl.Denied", |_| Err(Fault::security("module signature rejected")));
    harness.framework.install(descriptor).unwrap().start().unwrap();
}

#[test]
fn test_security_fault_disables_the_owning_module_components() {
    let harness = Harness::new();
    harness.start_module("bystander", vec![ComponentMetadata::new("other", TRACED)]);
    guarded(&harness);
    assert_eq!(harness.trace.count("watcher: activate"), 1);

    let fault = harness.request("api.Vault").unwrap_err();

    assert_eq!(fault.kind(), FaultKind::Security);
    assert!(!harness.runtime.find_manager("vault").unwrap().is_enabled());
    assert!(!harness.runtime.find_manager("watcher").unwrap().is_enabled());
    assert_eq!(harness.trace.count("watcher: deactivate"), 1);
    assert_eq!(harness.registered("api.Vault"), 0);

    assert!(harness.runtime.find_manager("other").unwrap().is_enabled());
    assert_eq!(harness.trace.count("other: deactivate"), 0);

    let errors = harness.sink.matching("Failed to activate component 'vault'");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].severity, Severity::Error);
    assert_eq!(errors[0].fault.as_ref().map(Fault::kind), Some(FaultKind::Security));
}

#[test]
fn test_library_load_fault_propagates_without_disabling() {
    let harness = Harness::new();
    harness.start_module("broken", vec![ComponentMetadata::new("ghost", "impl.Absent").providing("api.Ghost")]);

    let fault = harness.request("api.Ghost").unwrap_err();

    assert_eq!(fault.kind(), FaultKind::LibraryLoad);
    assert!(harness.runtime.find_manager("ghost").unwrap().is_enabled());
    let dto = &harness.runtime.component_configuration_dtos("ghost")[0];
    assert_eq!(dto.state, ComponentState::Satisfied);
    assert_eq!(dto.instance_id, None);
}

#[test]
fn test_ordinary_faults_are_contained() {
    let harness = Harness::new();
    let descriptor = traced_module(
        "fragile",
        vec![
            ComponentMetadata::new("grumpy", "impl.Grumpy").providing("api.Grumpy"),
            ComponentMetadata::new("crashy", "impl.Crashy").providing("api.Crashy"),
        ],
        &harness.trace,
    )
    .with_implementation("impl.Grumpy", |_| Err(Fault::runtime("not in the mood")))
    .with_implementation("impl.Crashy", |_| -> Result<Box<dyn ComponentInstance>, Fault> {
        panic!("constructor blew up")
    });
    harness.framework.install(descriptor).unwrap().start().unwrap();

    assert!(harness.request("api.Grumpy").unwrap().is_none());
    assert!(harness.request("api.Crashy").unwrap().is_none());

    // Both stay available for a later attempt.
    assert_eq!(harness.registered("api.Grumpy"), 1);
    assert_eq!(harness.registered("api.Crashy"), 1);
    let panic = harness.sink.matching("Failed to activate component 'crashy'");
    assert_eq!(panic[0].fault.as_ref().map(Fault::kind), Some(FaultKind::Panic));
}

#[test]
fn test_security_sweep_reached_through_a_dependency_of_another_module() {
    let harness = Harness::new();
    let descriptor = traced_module(
        "guarded",
        vec![ComponentMetadata::new("vault", "impl.Denied").providing("api.Vault")],
        &harness.trace,
    )
    .with_implementation("impl.Denied", |_| Err(Fault::security("module signature rejected")));
    harness.framework.install(descriptor).unwrap().start().unwrap();
    harness.start_module(
        "app",
        vec![ComponentMetadata::new("client", TRACED)
            .providing("api.Client")
            .with_reference(ReferenceMetadata::new("vault", "api.Vault"))],
    );
    assert_eq!(harness.registered("api.Client"), 1);

    let services = harness.framework.services().clone();
    let requester = harness.provider.info().clone();
    let reference = services.find_one(&Filter::for_interface("api.Client")).unwrap();
    let (done, outcome) = mpsc::channel();
    thread::spawn(move || {
        let served = services.get_service(&requester, &reference).map(|object| object.is_some());
        let _ = done.send(served);
    });
    let served = outcome
        .recv_timeout(Duration::from_secs(10))
        .expect("requesting the client must not hang");

    // The client could not bind its mandatory vault, so it serves nothing.
    assert_eq!(served.ok(), Some(false));
    assert!(!harness.runtime.find_manager("vault").unwrap().is_enabled());
    assert_eq!(harness.registered("api.Vault"), 0);

    let client = harness.runtime.find_manager("client").unwrap();
    assert!(client.is_enabled(), "components of other modules stay enabled");
    let dto = &harness.runtime.component_configuration_dtos("client")[0];
    assert_eq!(dto.state, ComponentState::UnsatisfiedReference);
    assert_eq!(dto.instance_id, None);
    assert_eq!(harness.registered("api.Client"), 0);
    assert_eq!(harness.trace.count("client: activate"), 0);

    let failures = harness.sink.matching("Could not obtain service");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].fault.as_ref().map(Fault::kind), Some(FaultKind::Security));
}
