use super::{Binding, build_router};
use crate::auth::{AuthError, TokenExchanger};
use crate::config::{Backend, Config, Interceptor, Route};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use gangway_core::{descriptor::ReflectionSource, invoke::Invoker};
use registry_service::RegistryService;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Endpoint, Server};
use tower::ServiceExt;

/// Token exchanger double: counts calls and returns a fixed result.
struct MockExchanger {
    calls: AtomicUsize,
    credential: Option<String>,
}

impl MockExchanger {
    fn accepting() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            credential: Some("fixture-credential".to_string()),
        })
    }

    fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            credential: None,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenExchanger for MockExchanger {
    async fn exchange(&self, _token: &str) -> Result<String, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credential.clone().ok_or(AuthError::Rejected)
    }
}

/// Serves the fixture backend plus its reflection endpoint on an ephemeral
/// port, returning the address and a counter handle.
async fn spawn_backend() -> (String, RegistryService) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let reflection = tonic_reflection::server::Builder::configure()
        .register_file_descriptor_set(registry_service::file_descriptor_set())
        .build_v1()
        .unwrap();
    let service = RegistryService::new();
    let backend = service.clone();

    tokio::spawn(async move {
        Server::builder()
            .add_service(reflection)
            .add_service(backend)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
    });

    (format!("http://{addr}"), service)
}

/// Builds a gateway router over a freshly spawned fixture backend.
/// `routes` entries are `(path, http method, rpc name)`.
async fn gateway(
    routes: &[(&str, &str, &str)],
    timeout_secs: u64,
    exchanger: Arc<MockExchanger>,
) -> (Router, RegistryService) {
    let (addr, service) = spawn_backend().await;

    let config = Config {
        listen: "127.0.0.1:0".parse().unwrap(),
        timeout_secs,
        interceptor: Interceptor {
            url: "http://127.0.0.1:9/unused".to_string(),
        },
        backends: vec![Backend {
            name: "registry".to_string(),
            addr: addr.clone(),
            service: registry_service::SERVICE_NAME.to_string(),
        }],
        routes: routes
            .iter()
            .map(|(path, method, rpc)| Route {
                path: path.to_string(),
                method: method.to_string(),
                backend: "registry".to_string(),
                rpc: rpc.to_string(),
            })
            .collect(),
    };

    let channel = Endpoint::new(addr).unwrap().connect_lazy();
    let bindings = HashMap::from([(
        "registry".to_string(),
        Binding {
            service: registry_service::SERVICE_NAME.to_string(),
            channel: channel.clone(),
            invoker: Invoker::new(ReflectionSource::new(channel.clone()), channel),
        },
    )]);

    let router = build_router(&config, bindings, exchanger).unwrap();
    (router, service)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn authorized(method: &str, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, "Bearer abc123")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn query_parameters_reach_the_backend() {
    let exchanger = MockExchanger::accepting();
    let (router, _service) = gateway(&[("/namespaces", "GET", "Get")], 5, exchanger).await;

    let request = authorized("GET", "/namespaces?name=ns1", Body::empty());
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload, serde_json::json!({"ok": true}));
}

#[tokio::test]
async fn empty_authorization_fails_before_any_call() {
    let exchanger = MockExchanger::accepting();
    let (router, service) =
        gateway(&[("/namespaces", "GET", "Get")], 5, exchanger.clone()).await;

    let request = Request::builder()
        .method("GET")
        .uri("/namespaces?name=ns1")
        .header(header::AUTHORIZATION, "")
        .body(Body::empty())
        .unwrap();
    let (status, _body) = send(&router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(exchanger.calls(), 0);
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn a_header_short_of_the_minimum_is_rejected() {
    let exchanger = MockExchanger::accepting();
    let (router, service) =
        gateway(&[("/namespaces", "GET", "Get")], 5, exchanger.clone()).await;

    // 8 bytes: scheme prefix plus a single credential character.
    let request = Request::builder()
        .method("GET")
        .uri("/namespaces")
        .header(header::AUTHORIZATION, "Bearer x")
        .body(Body::empty())
        .unwrap();
    let (status, _body) = send(&router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(exchanger.calls(), 0);
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn a_rejected_exchange_is_unauthorized() {
    let exchanger = MockExchanger::rejecting();
    let (router, service) =
        gateway(&[("/namespaces", "GET", "Get")], 5, exchanger.clone()).await;

    let request = authorized("GET", "/namespaces?name=ns1", Body::empty());
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "invalid token");
    assert_eq!(exchanger.calls(), 1);
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn a_backend_denial_maps_to_forbidden() {
    let exchanger = MockExchanger::accepting();
    let (router, _service) = gateway(&[("/namespaces", "GET", "Get")], 5, exchanger).await;

    let request = authorized("GET", "/namespaces?name=denied", Body::empty());
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    // The status message appears exactly once: one write per request.
    assert_eq!(body, "forbidden");
}

#[tokio::test]
async fn an_unknown_rpc_is_not_found_without_a_call() {
    let exchanger = MockExchanger::accepting();
    let (router, service) =
        gateway(&[("/vanished", "GET", "Vanish")], 5, exchanger).await;

    let request = authorized("GET", "/vanished", Body::empty());
    let (status, _body) = send(&router, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn a_slow_backend_times_out_instead_of_hanging() {
    let exchanger = MockExchanger::accepting();
    let (router, _service) = gateway(&[("/slow", "POST", "Get")], 1, exchanger).await;

    let body = Body::from(r#"{"name":"slow","delay":5000}"#);
    let request = authorized("POST", "/slow", body);

    let started = std::time::Instant::now();
    let (status, _body) = send(&router, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
}

#[tokio::test]
async fn path_parameters_override_body_fields() {
    let exchanger = MockExchanger::accepting();
    let (router, _service) =
        gateway(&[("/registry/{name}", "POST", "Put")], 5, exchanger).await;

    let body = Body::from(r#"{"name":"from-body","value":"v1"}"#);
    let request = authorized("POST", "/registry/from-path", body);
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload, serde_json::json!({"message": "from-path=v1"}));
}

#[tokio::test]
async fn the_exchanged_credential_reaches_the_backend() {
    let exchanger = MockExchanger::accepting();
    let (router, _service) = gateway(&[("/whoami", "GET", "Whoami")], 5, exchanger).await;

    let request = authorized("GET", "/whoami", Body::empty());
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        payload,
        serde_json::json!({"value": "fixture-credential"})
    );
}

#[tokio::test]
async fn the_health_probe_needs_no_credential() {
    let exchanger = MockExchanger::accepting();
    let (router, _service) = gateway(&[], 5, exchanger).await;

    let request = Request::builder()
        .method("GET")
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}
