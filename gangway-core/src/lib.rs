//! # Gangway Core
//!
//! `gangway-core` is the protocol-translation runtime behind the gangway
//! gateway. It can call any unary method on any gRPC server without
//! compile-time knowledge of the Protobuf schema: method shapes are
//! discovered at run time from the serving backend itself.
//!
//! ## Key Components
//!
//! * **[`descriptor::DescriptorSource`]:** Resolves `service`/`method` names
//!   into [`prost_reflect::MethodDescriptor`]s. The reflection-backed
//!   implementation discovers and memoizes schemas from a live connection;
//!   the static implementation serves them from a pinned descriptor set.
//! * **[`invoke::Invoker`]:** Resolves a method, issues the call once with
//!   call metadata under a deadline, and collects the terminal
//!   [`invoke::CallOutcome`].
//! * **[`document`]:** Builds the untyped JSON request document from an HTTP
//!   body and URL-derived parameters.
//! * **[`metadata`]:** Turns forwardable HTTP headers plus the exchanged
//!   backend credential into call metadata.
//!
//! ## Internal clients
//!
//! The lower-level pieces are exposed as well, for callers that want to drive
//! them directly:
//!
//! * **[`grpc::client::GrpcClient`]:** A generic unary gRPC client using a
//!   JSON codec.
//! * **[`reflection::client::ReflectionClient`]:** A client for the gRPC
//!   Server Reflection Protocol, limited to what the gateway needs.
//!
//! ## JsonCodec
//!
//! An implementation of `tonic::codec::Codec` that transcodes JSON to
//! Protobuf bytes (and vice versa) on the fly, validating against the
//! discovered message descriptors.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that
//! consumers use compatible versions of these underlying dependencies.
pub mod descriptor;
pub mod document;
pub mod grpc;
pub mod invoke;
pub mod metadata;
pub mod reflection;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
