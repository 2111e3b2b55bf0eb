//! # Generic Unary Client
//!
//! A thin wrapper over `tonic::client::Grpc` that can call any unary method
//! described by a [`MethodDescriptor`]. The HTTP/2 path is constructed at run
//! time, metadata pairs are converted into tonic's `MetadataMap`, and payload
//! serialization is delegated to [`super::codec::JsonCodec`], so no knowledge
//! of the message layout is needed at compile time.
use super::codec::JsonCodec;
use crate::BoxError;
use http_body::Body as HttpBody;
use prost_reflect::MethodDescriptor;
use std::str::FromStr;
use std::time::Duration;
use tonic::{
    client::GrpcService,
    metadata::{
        MetadataKey, MetadataValue,
        errors::{InvalidMetadataKey, InvalidMetadataValue},
    },
    transport::Channel,
};

#[derive(thiserror::Error, Debug)]
pub enum GrpcRequestError {
    #[error("the client transport was not ready: '{0}'")]
    NotReady(#[source] BoxError),

    #[error("invalid metadata key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },

    #[error("invalid metadata value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValue,
    },
}

/// A gRPC client that is agnostic to the messages being exchanged.
pub struct GrpcClient<S = Channel> {
    inner: tonic::client::Grpc<S>,
}

impl<S: Clone> Clone for GrpcClient<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            inner: tonic::client::Grpc::new(service),
        }
    }

    /// Performs a unary call (single request -> single response), exactly
    /// once. When `timeout` is given it is attached as the gRPC deadline so
    /// the server sees it too.
    ///
    /// # Returns
    ///
    /// * `Ok(Ok(value))` - Successful RPC execution.
    /// * `Ok(Err(status))` - RPC executed, but the server returned a terminal
    ///   error status.
    /// * `Err(GrpcRequestError)` - The request could not be sent.
    pub async fn unary(
        &mut self,
        method: MethodDescriptor,
        payload: serde_json::Value,
        metadata: Vec<(String, String)>,
        timeout: Option<Duration>,
    ) -> Result<Result<serde_json::Value, tonic::Status>, GrpcRequestError> {
        self.inner
            .ready()
            .await
            .map_err(|e| GrpcRequestError::NotReady(e.into()))?;

        let codec = JsonCodec::new(method.input(), method.output());
        let path = method_path(&method);

        let mut request = tonic::Request::new(payload);
        attach_metadata(&mut request, metadata)?;
        if let Some(timeout) = timeout {
            request.set_timeout(timeout);
        }

        match self.inner.unary(request, path, codec).await {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }
}

fn method_path(method: &MethodDescriptor) -> http::uri::PathAndQuery {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    // Proto identifiers only contain path-safe characters.
    http::uri::PathAndQuery::from_str(&path).expect("valid gRPC path")
}

fn attach_metadata<T>(
    request: &mut tonic::Request<T>,
    metadata: Vec<(String, String)>,
) -> Result<(), GrpcRequestError> {
    for (key, value) in metadata {
        let name = MetadataKey::from_str(&key).map_err(|source| {
            GrpcRequestError::InvalidMetadataKey {
                key: key.clone(),
                source,
            }
        })?;
        let value = MetadataValue::from_str(&value)
            .map_err(|source| GrpcRequestError::InvalidMetadataValue { key, source })?;
        request.metadata_mut().insert(name, value);
    }
    Ok(())
}
