//! # Dynamic Invocation
//!
//! The [`Invoker`] ties the pieces together for one call: resolve the method
//! schema through a [`DescriptorSource`], issue the unary call exactly once
//! with the supplied metadata, and collect the terminal [`CallOutcome`] —
//! all bounded by the caller's deadline.
//!
//! Every failure class is folded into a `CallOutcome::Failure` with a
//! `tonic::Code`, so callers translate outcomes uniformly instead of handling
//! a zoo of error types. Nothing is retried: a call succeeds once or fails
//! once within its deadline.
use crate::BoxError;
use crate::descriptor::DescriptorSource;
use crate::grpc::client::{GrpcClient, GrpcRequestError};
use http_body::Body as HttpBody;
use std::time::Duration;
use tonic::{Code, client::GrpcService, transport::Channel};

/// The terminal result of one bridged call. Exactly one variant is produced
/// per call; outcomes are never cached and calls are never retried.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// The call completed and returned this payload.
    Success(serde_json::Value),
    /// The call failed with a terminal status.
    Failure { code: Code, message: String },
}

impl CallOutcome {
    pub fn failure(code: Code, message: impl Into<String>) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }
}

/// Issues dynamic unary calls over a shared long-lived connection.
///
/// The invoker does not own the connection lifecycle; it only issues calls on
/// the service it was built with.
pub struct Invoker<D, S = Channel> {
    source: D,
    client: GrpcClient<S>,
}

impl<D: Clone, S: Clone> Clone for Invoker<D, S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            client: self.client.clone(),
        }
    }
}

impl<D, S> Invoker<D, S>
where
    D: DescriptorSource,
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(source: D, service: S) -> Self {
        Self {
            source,
            client: GrpcClient::new(service),
        }
    }

    /// Resolves `service`/`method` and calls it once with `document` as the
    /// request and `metadata` attached, bounded by `deadline`.
    ///
    /// The deadline covers schema resolution and the call combined; expiry
    /// aborts whichever step is pending and surfaces as an unavailability
    /// failure rather than a hang.
    pub async fn invoke(
        &self,
        service: &str,
        method: &str,
        document: serde_json::Value,
        metadata: Vec<(String, String)>,
        deadline: Duration,
    ) -> CallOutcome {
        let call = self.call(service, method, document, metadata, deadline);
        match tokio::time::timeout(deadline, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(service, method, "call aborted: deadline exceeded");
                CallOutcome::failure(
                    Code::Unavailable,
                    format!("deadline of {}ms exceeded", deadline.as_millis()),
                )
            }
        }
    }

    async fn call(
        &self,
        service: &str,
        method: &str,
        document: serde_json::Value,
        metadata: Vec<(String, String)>,
        deadline: Duration,
    ) -> CallOutcome {
        let descriptor = match self.source.resolve_method(service, method).await {
            Ok(descriptor) => descriptor,
            Err(err) if err.is_not_found() => {
                tracing::warn!(service, method, "method resolution failed: {err}");
                return CallOutcome::failure(Code::Unimplemented, err.to_string());
            }
            Err(err) => {
                tracing::warn!(service, method, "schema discovery failed: {err}");
                return CallOutcome::failure(Code::Unavailable, err.to_string());
            }
        };

        if descriptor.is_client_streaming() || descriptor.is_server_streaming() {
            return CallOutcome::failure(
                Code::Unimplemented,
                format!("method '{service}/{method}' is not unary"),
            );
        }

        let mut client = self.client.clone();
        match client
            .unary(descriptor, document, metadata, Some(deadline))
            .await
        {
            Ok(Ok(payload)) => {
                tracing::debug!(service, method, "call succeeded");
                CallOutcome::Success(payload)
            }
            Ok(Err(status)) => {
                tracing::debug!(
                    service,
                    method,
                    code = ?status.code(),
                    "backend returned a terminal error status"
                );
                CallOutcome::Failure {
                    code: status.code(),
                    message: status.message().to_string(),
                }
            }
            Err(err @ GrpcRequestError::NotReady(_)) => {
                tracing::warn!(service, method, "transport failure: {err}");
                CallOutcome::failure(Code::Unavailable, err.to_string())
            }
            Err(err) => CallOutcome::failure(Code::Internal, err.to_string()),
        }
    }
}
