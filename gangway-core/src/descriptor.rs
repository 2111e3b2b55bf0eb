//! # Descriptor Sources
//!
//! A [`DescriptorSource`] resolves a `service`/`method` name pair into the
//! [`MethodDescriptor`] needed to build and parse a dynamic call. A source
//! either returns a usable schema or reports not-found; it never answers with
//! a best-effort mismatched shape.
//!
//! Two implementations are provided:
//!
//! * [`ReflectionSource`] discovers schemas from the live backend via server
//!   reflection and memoizes one descriptor pool per service.
//! * [`StaticSource`] serves schemas from a descriptor set supplied at
//!   construction, for deployments with pinned schemas and for tests.
use crate::BoxError;
use crate::reflection::client::{ReflectionClient, ReflectionError};
use http_body::Body as HttpBody;
use prost_reflect::{DescriptorPool, MethodDescriptor};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::client::GrpcService;
use tonic::transport::Channel;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("service '{0}' is not exposed by the backend")]
    ServiceNotFound(String),

    #[error("method '{0}' not found on service '{1}'")]
    MethodNotFound(String, String),

    #[error("schema discovery failed: '{0}'")]
    Discovery(#[from] ReflectionError),

    #[error("backend returned an invalid descriptor set: '{0}'")]
    InvalidDescriptor(#[from] prost_reflect::DescriptorError),
}

impl ResolveError {
    /// True when the lookup cleanly reported an unknown service or method.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ServiceNotFound(_) | Self::MethodNotFound(..))
    }
}

/// Resolves fully qualified method names into schemas.
pub trait DescriptorSource {
    fn resolve_method(
        &self,
        service: &str,
        method: &str,
    ) -> impl Future<Output = Result<MethodDescriptor, ResolveError>> + Send;
}

fn find_method(pool: &DescriptorPool, service: &str, method: &str) -> Option<MethodDescriptor> {
    pool.get_service_by_name(service)?
        .methods()
        .find(|m| m.name() == method)
}

fn not_found(pool: &DescriptorPool, service: &str, method: &str) -> ResolveError {
    if pool.get_service_by_name(service).is_some() {
        ResolveError::MethodNotFound(method.to_string(), service.to_string())
    } else {
        ResolveError::ServiceNotFound(service.to_string())
    }
}

/// Schema resolution backed by the backend's own reflection service.
///
/// Discovered pools are memoized per service name. The cache supports
/// concurrent readers; concurrent misses for the same service may each run a
/// discovery round-trip, which is harmless since the last write wins with an
/// equivalent pool.
pub struct ReflectionSource<S = Channel> {
    client: ReflectionClient<S>,
    pools: Arc<RwLock<HashMap<String, DescriptorPool>>>,
}

impl<S: Clone> Clone for ReflectionSource<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            pools: self.pools.clone(),
        }
    }
}

impl<S> ReflectionSource<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            client: ReflectionClient::new(service),
            pools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn discover(&self, service: &str) -> Result<DescriptorPool, ResolveError> {
        let mut client = self.client.clone();
        let fd_set = client
            .file_descriptor_set_for_symbol(service)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    ResolveError::ServiceNotFound(service.to_string())
                } else {
                    ResolveError::Discovery(err)
                }
            })?;

        let pool = DescriptorPool::from_file_descriptor_set(fd_set)?;
        self.pools
            .write()
            .await
            .insert(service.to_string(), pool.clone());
        Ok(pool)
    }
}

impl<S> DescriptorSource for ReflectionSource<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    async fn resolve_method(
        &self,
        service: &str,
        method: &str,
    ) -> Result<MethodDescriptor, ResolveError> {
        let cached = self.pools.read().await.get(service).cloned();
        if let Some(pool) = cached {
            if let Some(descriptor) = find_method(&pool, service, method) {
                tracing::debug!(service, method, "descriptor cache hit");
                return Ok(descriptor);
            }
            // The cached schema does not know this method. The backend may
            // have redeployed with a new shape, so rediscover once before
            // reporting not-found.
            tracing::debug!(service, method, "cached schema is missing the method");
        }

        let pool = self.discover(service).await?;
        find_method(&pool, service, method).ok_or_else(|| not_found(&pool, service, method))
    }
}

/// Schema resolution from a descriptor set supplied at construction.
#[derive(Debug, Clone)]
pub struct StaticSource {
    pool: DescriptorPool,
}

impl StaticSource {
    /// Builds a source from an encoded `FileDescriptorSet`.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, prost_reflect::DescriptorError> {
        Ok(Self {
            pool: DescriptorPool::decode(bytes)?,
        })
    }

    pub fn from_file_descriptor_set(
        fd_set: prost_types::FileDescriptorSet,
    ) -> Result<Self, prost_reflect::DescriptorError> {
        Ok(Self {
            pool: DescriptorPool::from_file_descriptor_set(fd_set)?,
        })
    }
}

impl DescriptorSource for StaticSource {
    async fn resolve_method(
        &self,
        service: &str,
        method: &str,
    ) -> Result<MethodDescriptor, ResolveError> {
        find_method(&self.pool, service, method)
            .ok_or_else(|| not_found(&self.pool, service, method))
    }
}
