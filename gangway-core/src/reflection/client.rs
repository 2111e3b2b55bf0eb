//! # Reflection Client
//!
//! A client for `grpc.reflection.v1` that can assemble the complete
//! `FileDescriptorSet` for a symbol served by a remote backend.
//!
//! A reflection server answers one file at a time, so resolving a symbol
//! means chasing the import graph: the file declaring the symbol is fetched
//! first, then every transitive dependency that has not been seen yet, until
//! the set is closed under imports.
//!
//! ## References
//!
//! * [gRPC Server Reflection Protocol](https://github.com/grpc/grpc/blob/master/doc/server-reflection.md)
use super::proto::{
    ServerReflectionRequest, ServerReflectionResponse,
    server_reflection_client::ServerReflectionClient, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};
use crate::BoxError;
use futures_util::stream::once;
use http_body::Body as HttpBody;
use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Streaming, client::GrpcService, transport::Channel};

#[derive(Debug, thiserror::Error)]
pub enum ReflectionError {
    #[error("failed to open the reflection stream, the backend may not expose reflection: '{0}'")]
    StreamInit(#[source] tonic::Status),

    #[error("the reflection stream failed: '{0}'")]
    Stream(#[source] tonic::Status),

    #[error("the reflection stream closed before resolution finished")]
    ClosedEarly,

    #[error("failed to enqueue a reflection request")]
    RequestDropped,

    #[error("the reflection service reported error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("unexpected reflection response variant: {0}")]
    UnexpectedResponse(String),

    #[error("invalid file descriptor in reflection response: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl ReflectionError {
    /// True when the backend cleanly reported that the requested symbol does
    /// not exist, as opposed to the lookup itself breaking down.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Stream(status) => status.code() == tonic::Code::NotFound,
            Self::Remote { code, .. } => *code == tonic::Code::NotFound as i32,
            _ => false,
        }
    }
}

// The host field of reflection requests is undocumented and servers ignore
// it, so it is always sent empty.
fn request(message: MessageRequest) -> ServerReflectionRequest {
    ServerReflectionRequest {
        host: String::new(),
        message_request: Some(message),
    }
}

fn variant_label(response: Option<MessageResponse>) -> String {
    response
        .map(|message| format!("{message:?}"))
        .unwrap_or_else(|| "empty response".to_string())
}

/// A client for the gRPC Server Reflection Protocol.
#[derive(Debug, Clone)]
pub struct ReflectionClient<S = Channel> {
    inner: ServerReflectionClient<S>,
}

impl<S> ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            inner: ServerReflectionClient::new(service),
        }
    }

    /// Fetches the file declaring `symbol` (e.g. `my.package.MyService`) and
    /// every transitive import, returning the closed `FileDescriptorSet`.
    ///
    /// # Returns
    ///
    /// * `Ok(fd_set)` - The complete descriptor set for the symbol.
    /// * `Err(ReflectionError)` - The stream failed or the symbol is unknown
    ///   (see [`ReflectionError::is_not_found`]).
    pub async fn file_descriptor_set_for_symbol(
        &mut self,
        symbol: &str,
    ) -> Result<FileDescriptorSet, ReflectionError> {
        let (tx, rx) = mpsc::channel(16);

        let mut responses = self
            .inner
            .server_reflection_info(ReceiverStream::new(rx))
            .await
            .map_err(ReflectionError::StreamInit)?
            .into_inner();

        tx.send(request(MessageRequest::FileContainingSymbol(
            symbol.to_string(),
        )))
        .await
        .map_err(|_| ReflectionError::RequestDropped)?;

        let files = collect_files(&mut responses, tx).await?;

        Ok(FileDescriptorSet {
            file: files.into_values().collect(),
        })
    }

    /// Lists the full names of all services exposed by the backend.
    pub async fn list_services(&mut self) -> Result<Vec<String>, ReflectionError> {
        let initial = request(MessageRequest::ListServices(String::new()));

        let mut responses = self
            .inner
            .server_reflection_info(once(async move { initial }))
            .await
            .map_err(ReflectionError::StreamInit)?
            .into_inner();

        let response = next_message(&mut responses).await?;

        match response.message_response {
            Some(MessageResponse::ListServicesResponse(list)) => {
                Ok(list.service.into_iter().map(|s| s.name).collect())
            }
            Some(MessageResponse::ErrorResponse(err)) => Err(ReflectionError::Remote {
                code: err.error_code,
                message: err.error_message,
            }),
            other => Err(ReflectionError::UnexpectedResponse(variant_label(other))),
        }
    }
}

async fn next_message(
    responses: &mut Streaming<ServerReflectionResponse>,
) -> Result<ServerReflectionResponse, ReflectionError> {
    responses
        .message()
        .await
        .map_err(ReflectionError::Stream)?
        .ok_or(ReflectionError::ClosedEarly)
}

/// Drains the stream until every requested file and its imports have been
/// received. `pending` counts requests without an answer yet; each file
/// batch may fan out further requests for unseen dependencies.
async fn collect_files(
    responses: &mut Streaming<ServerReflectionResponse>,
    tx: mpsc::Sender<ServerReflectionRequest>,
) -> Result<HashMap<String, FileDescriptorProto>, ReflectionError> {
    let mut files: HashMap<String, FileDescriptorProto> = HashMap::new();
    let mut requested: HashSet<String> = HashSet::new();
    let mut pending = 1usize;

    while pending > 0 {
        let response = next_message(responses).await?;
        pending -= 1;

        let batch = match response.message_response {
            Some(MessageResponse::FileDescriptorResponse(batch)) => batch,
            Some(MessageResponse::ErrorResponse(err)) => {
                return Err(ReflectionError::Remote {
                    code: err.error_code,
                    message: err.error_message,
                });
            }
            other => return Err(ReflectionError::UnexpectedResponse(variant_label(other))),
        };

        for raw in batch.file_descriptor_proto {
            let file = FileDescriptorProto::decode(raw.as_slice())?;
            let Some(name) = file.name.clone() else {
                continue;
            };
            if files.contains_key(&name) {
                continue;
            }

            for dep in &file.dependency {
                if !files.contains_key(dep) && requested.insert(dep.clone()) {
                    tx.send(request(MessageRequest::FileByFilename(dep.clone())))
                        .await
                        .map_err(|_| ReflectionError::RequestDropped)?;
                    pending += 1;
                }
            }

            files.insert(name, file);
        }
    }

    Ok(files)
}
