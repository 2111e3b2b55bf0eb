//! Hand-maintained bindings for the subset of `grpc.reflection.v1` the
//! gateway speaks: symbol and file lookups plus service listing. Request and
//! response variants the gateway never sends (extension lookups) are omitted;
//! unknown fields in responses are skipped by prost during decoding.
//!
//! Field numbers follow `reflection/v1/reflection.proto` from the gRPC
//! repository and must not be changed independently of it.

/// Single request message of the `ServerReflectionInfo` stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerReflectionRequest {
    #[prost(string, tag = "1")]
    pub host: String,
    #[prost(oneof = "server_reflection_request::MessageRequest", tags = "3, 4, 7")]
    pub message_request: Option<server_reflection_request::MessageRequest>,
}

pub mod server_reflection_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum MessageRequest {
        /// Find a proto file by its import path.
        #[prost(string, tag = "3")]
        FileByFilename(String),
        /// Find the proto file declaring the given fully qualified symbol.
        #[prost(string, tag = "4")]
        FileContainingSymbol(String),
        /// List the full names of the registered services.
        #[prost(string, tag = "7")]
        ListServices(String),
    }
}

/// Single response message of the `ServerReflectionInfo` stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerReflectionResponse {
    #[prost(string, tag = "1")]
    pub valid_host: String,
    #[prost(oneof = "server_reflection_response::MessageResponse", tags = "4, 6, 7")]
    pub message_response: Option<server_reflection_response::MessageResponse>,
}

pub mod server_reflection_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum MessageResponse {
        #[prost(message, tag = "4")]
        FileDescriptorResponse(super::FileDescriptorResponse),
        #[prost(message, tag = "6")]
        ListServicesResponse(super::ListServiceResponse),
        #[prost(message, tag = "7")]
        ErrorResponse(super::ErrorResponse),
    }
}

/// A batch of serialized `FileDescriptorProto` messages.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileDescriptorResponse {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub file_descriptor_proto: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListServiceResponse {
    #[prost(message, repeated, tag = "1")]
    pub service: Vec<ServiceResponse>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceResponse {
    #[prost(string, tag = "1")]
    pub name: String,
}

/// Error reported inside the stream, carrying a `tonic::Code` value.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorResponse {
    #[prost(int32, tag = "1")]
    pub error_code: i32,
    #[prost(string, tag = "2")]
    pub error_message: String,
}

pub mod server_reflection_client {
    use crate::BoxError;
    use http_body::Body as HttpBody;

    /// Client for `grpc.reflection.v1.ServerReflection`, exposing its single
    /// bidirectional streaming method.
    #[derive(Debug, Clone)]
    pub struct ServerReflectionClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl<T> ServerReflectionClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::Body>,
        T::Error: Into<BoxError>,
        T::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
        <T::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
    {
        pub fn new(inner: T) -> Self {
            Self {
                inner: tonic::client::Grpc::new(inner),
            }
        }

        pub async fn server_reflection_info(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = super::ServerReflectionRequest>,
        ) -> Result<
            tonic::Response<tonic::Streaming<super::ServerReflectionResponse>>,
            tonic::Status,
        > {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("service was not ready: {}", e.into()))
            })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo",
            );
            self.inner
                .streaming(request.into_streaming_request(), path, codec)
                .await
        }
    }
}
