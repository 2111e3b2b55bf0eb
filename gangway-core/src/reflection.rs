//! # Server Reflection
//!
//! Support for the gRPC Server Reflection Protocol (`grpc.reflection.v1`),
//! which lets the gateway query a backend for its own Protobuf schema at run
//! time instead of shipping descriptors with the gateway binary.
pub mod client;
mod proto;
