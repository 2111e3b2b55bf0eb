use gangway_core::descriptor::ReflectionSource;
use gangway_core::invoke::{CallOutcome, Invoker};
use gangway_core::metadata::BACKEND_CREDENTIAL_KEY;
use registry_service::RegistryService;
use std::time::Duration;
use tonic::{Code, service::Routes};

const DEADLINE: Duration = Duration::from_secs(5);

fn backend() -> (Routes, RegistryService) {
    let reflection = tonic_reflection::server::Builder::configure()
        .register_file_descriptor_set(registry_service::file_descriptor_set())
        .build_v1()
        .unwrap();
    let service = RegistryService::new();
    let routes = Routes::new(reflection).add_service(service.clone());
    (routes, service)
}

fn invoker(routes: Routes) -> Invoker<ReflectionSource<Routes>, Routes> {
    Invoker::new(ReflectionSource::new(routes.clone()), routes)
}

#[tokio::test]
async fn a_unary_call_succeeds() {
    let (routes, _service) = backend();
    let outcome = invoker(routes)
        .invoke(
            registry_service::SERVICE_NAME,
            "Get",
            serde_json::json!({"name": "ns1"}),
            vec![],
            DEADLINE,
        )
        .await;

    match outcome {
        CallOutcome::Success(payload) => {
            assert_eq!(payload, serde_json::json!({"ok": true}))
        }
        other => panic!("expected success, got: {other:?}"),
    }
}

#[tokio::test]
async fn document_fields_outside_the_schema_are_ignored() {
    let (routes, _service) = backend();
    let outcome = invoker(routes)
        .invoke(
            registry_service::SERVICE_NAME,
            "Get",
            serde_json::json!({"name": "ns1", "junk": "from-a-query-param"}),
            vec![],
            DEADLINE,
        )
        .await;

    assert!(matches!(outcome, CallOutcome::Success(_)));
}

#[tokio::test]
async fn a_terminal_error_status_is_passed_through() {
    let (routes, _service) = backend();
    let outcome = invoker(routes)
        .invoke(
            registry_service::SERVICE_NAME,
            "Get",
            serde_json::json!({"name": "denied"}),
            vec![],
            DEADLINE,
        )
        .await;

    match outcome {
        CallOutcome::Failure { code, message } => {
            assert_eq!(code, Code::PermissionDenied);
            assert_eq!(message, "forbidden");
        }
        other => panic!("expected a failure, got: {other:?}"),
    }
}

#[tokio::test]
async fn an_unknown_method_fails_without_a_call() {
    let (routes, service) = backend();
    let outcome = invoker(routes)
        .invoke(
            registry_service::SERVICE_NAME,
            "Vanish",
            serde_json::json!({}),
            vec![],
            DEADLINE,
        )
        .await;

    assert!(matches!(
        outcome,
        CallOutcome::Failure {
            code: Code::Unimplemented,
            ..
        }
    ));
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn an_unknown_service_fails_without_a_call() {
    let (routes, service) = backend();
    let outcome = invoker(routes)
        .invoke(
            "registry.Ghost",
            "Get",
            serde_json::json!({}),
            vec![],
            DEADLINE,
        )
        .await;

    assert!(matches!(
        outcome,
        CallOutcome::Failure {
            code: Code::Unimplemented,
            ..
        }
    ));
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn the_deadline_bounds_the_whole_call() {
    let (routes, _service) = backend();

    let started = std::time::Instant::now();
    let outcome = invoker(routes)
        .invoke(
            registry_service::SERVICE_NAME,
            "Get",
            serde_json::json!({"name": "slow", "delay": 2000}),
            vec![],
            Duration::from_millis(200),
        )
        .await;

    assert!(matches!(
        outcome,
        CallOutcome::Failure {
            code: Code::Unavailable,
            ..
        }
    ));
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[tokio::test]
async fn call_metadata_reaches_the_backend() {
    let (routes, _service) = backend();
    let outcome = invoker(routes)
        .invoke(
            registry_service::SERVICE_NAME,
            "Whoami",
            serde_json::json!({}),
            vec![(BACKEND_CREDENTIAL_KEY.to_string(), "cred-123".to_string())],
            DEADLINE,
        )
        .await;

    match outcome {
        CallOutcome::Success(payload) => {
            assert_eq!(payload, serde_json::json!({"value": "cred-123"}))
        }
        other => panic!("expected success, got: {other:?}"),
    }
}
