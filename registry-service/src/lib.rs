//! # Registry Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide a gRPC backend
//! for integration testing the gangway crates. It is not intended for
//! production use.
//!
//! The `registry.Registry` schema is assembled from `prost-types` structs at
//! run time and the methods are served through the same dynamic JSON codec
//! the gateway uses, so the fixture needs neither `protoc` nor generated
//! bindings. The descriptor set also feeds `tonic-reflection`'s server
//! builder in tests that need a reflection endpoint.
use gangway_core::grpc::codec::JsonCodec;
use prost::Message;
use prost_reflect::{DescriptorPool, MethodDescriptor, ServiceDescriptor};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use std::{
    convert::Infallible,
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};
use tonic::{
    Request, Response, Status,
    server::{Grpc, NamedService, UnaryService},
};

/// Fully qualified name of the fixture service.
pub const SERVICE_NAME: &str = "registry.Registry";

/// The fixture schema, assembled in code.
pub fn file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![file_descriptor()],
    }
}

/// The fixture schema in its wire encoding.
pub fn encoded_file_descriptor_set() -> Vec<u8> {
    file_descriptor_set().encode_to_vec()
}

fn file_descriptor() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("registry.proto".to_string()),
        package: Some("registry".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message(
                "GetRequest",
                vec![field("name", 1, Type::String), field("delay", 2, Type::Uint32)],
            ),
            message(
                "Entry",
                vec![
                    field("name", 1, Type::String),
                    field("ok", 2, Type::Bool),
                    field("value", 3, Type::String),
                ],
            ),
            message(
                "PutRequest",
                vec![field("name", 1, Type::String), field("value", 2, Type::String)],
            ),
            message("PutResponse", vec![field("message", 1, Type::String)]),
            message("WhoamiRequest", vec![]),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("Registry".to_string()),
            method: vec![
                method("Get", ".registry.GetRequest", ".registry.Entry"),
                method("Put", ".registry.PutRequest", ".registry.PutResponse"),
                method("Whoami", ".registry.WhoamiRequest", ".registry.Entry"),
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn field(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

/// A dynamic unary gRPC server for `registry.Registry`.
///
/// Behavior knobs used by tests:
///
/// * `Get` answers `{"ok": true}`; a `delay` field sleeps that many
///   milliseconds first, and the name `"denied"` yields
///   `PermissionDenied("forbidden")`.
/// * `Put` echoes what it stored, so merge precedence is observable.
/// * `Whoami` echoes the `authz-token` metadata value it received.
///
/// Clones share the call counter, so a test can keep a handle and assert how
/// many RPCs reached the backend.
#[derive(Clone)]
pub struct RegistryService {
    service: ServiceDescriptor,
    calls: Arc<AtomicUsize>,
}

impl RegistryService {
    pub fn new() -> Self {
        let pool = DescriptorPool::from_file_descriptor_set(file_descriptor_set())
            .expect("fixture schema is well formed");
        let service = pool
            .get_service_by_name(SERVICE_NAME)
            .expect("fixture schema declares the registry service");
        Self {
            service,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of RPCs that reached the service so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn method(&self, name: &str) -> Option<MethodDescriptor> {
        self.service.methods().find(|m| m.name() == name)
    }
}

impl Default for RegistryService {
    fn default() -> Self {
        Self::new()
    }
}

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

impl tower::Service<http::Request<tonic::body::Body>> for RegistryService {
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<tonic::body::Body>) -> Self::Future {
        let name = request
            .uri()
            .path()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let Some(method) = self.method(&name) else {
            return Box::pin(async move { Ok(unimplemented_response()) });
        };
        let handler = Handler {
            method: name,
            calls: self.calls.clone(),
        };
        Box::pin(async move {
            // The server encodes outputs and decodes inputs, the reverse of
            // a client.
            let codec = JsonCodec::new(method.output(), method.input());
            let mut grpc = Grpc::new(codec);
            Ok(grpc.unary(handler, request).await)
        })
    }
}

impl NamedService for RegistryService {
    const NAME: &'static str = "registry.Registry";
}

struct Handler {
    method: String,
    calls: Arc<AtomicUsize>,
}

impl UnaryService<serde_json::Value> for Handler {
    type Response = serde_json::Value;
    type Future = BoxFuture<Response<Self::Response>, Status>;

    fn call(&mut self, request: Request<serde_json::Value>) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let method = self.method.clone();
        Box::pin(async move { respond(&method, request).await.map(Response::new) })
    }
}

async fn respond(
    method: &str,
    request: Request<serde_json::Value>,
) -> Result<serde_json::Value, Status> {
    let credential = request
        .metadata()
        .get("authz-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = request.into_inner();

    match method {
        "Get" => {
            let delay = body["delay"].as_u64().unwrap_or(0);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if body["name"].as_str() == Some("denied") {
                return Err(Status::permission_denied("forbidden"));
            }
            Ok(serde_json::json!({ "ok": true }))
        }
        "Put" => {
            let name = body["name"].as_str().unwrap_or_default();
            let value = body["value"].as_str().unwrap_or_default();
            Ok(serde_json::json!({ "message": format!("{name}={value}") }))
        }
        "Whoami" => Ok(serde_json::json!({ "value": credential })),
        other => Err(Status::unimplemented(format!("unknown method '{other}'"))),
    }
}

fn unimplemented_response() -> http::Response<tonic::body::Body> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("grpc-status", (tonic::Code::Unimplemented as i32).to_string())
        .header("content-type", "application/grpc")
        .body(tonic::body::Body::default())
        .expect("static response parts are valid")
}
