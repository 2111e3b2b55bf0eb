//! # Generic gRPC Transport
//!
//! Low-level building blocks for performing gRPC calls with dynamic message
//! types. Unlike standard `tonic` clients, which are strongly typed, the
//! components here work on generic `serde_json::Value` structures and
//! transcode them to Protobuf binary format on the fly using discovered
//! message descriptors.
pub mod client;
pub mod codec;
