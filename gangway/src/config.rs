//! # Gateway Configuration
//!
//! The gateway is configured from one TOML file:
//!
//! ```toml
//! listen = "127.0.0.1:8080"
//! timeout-secs = 10
//!
//! [interceptor]
//! url = "http://127.0.0.1:9100/exchange"
//!
//! [[backend]]
//! name = "registry"
//! addr = "http://127.0.0.1:50051"
//! service = "registry.Registry"
//!
//! [[route]]
//! path = "/namespaces/{name}"
//! method = "POST"
//! backend = "registry"
//! rpc = "Put"
//! ```
//!
//! Each `[[backend]]` binds a long-lived connection to one fully qualified
//! service namespace; each `[[route]]` maps an HTTP method and path template
//! onto an RPC method of a backend. Pointing a route at a new RPC method is a
//! configuration change, never a rebuild.
use axum::routing::MethodFilter;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,
    /// Per-request deadline covering token exchange, schema discovery, and
    /// the backend call combined.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub interceptor: Interceptor,
    #[serde(default, rename = "backend")]
    pub backends: Vec<Backend>,
    #[serde(default, rename = "route")]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Interceptor {
    /// Token-exchange endpoint called once per inbound request.
    pub url: String,
}

/// One backend binding: a connection address plus the service namespace
/// calls are addressed to. Immutable once the process starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Backend {
    pub name: String,
    pub addr: String,
    pub service: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    /// axum path template; template parameters become document fields.
    pub path: String,
    /// HTTP method the route answers to.
    pub method: String,
    /// Name of the `[[backend]]` this route calls into.
    pub backend: String,
    /// RPC method name on the backend's service.
    pub rpc: String,
}

impl Route {
    pub(crate) fn method_filter(&self) -> Option<MethodFilter> {
        match self.method.to_ascii_uppercase().as_str() {
            "GET" => Some(MethodFilter::GET),
            "POST" => Some(MethodFilter::POST),
            "PUT" => Some(MethodFilter::PUT),
            "PATCH" => Some(MethodFilter::PATCH),
            "DELETE" => Some(MethodFilter::DELETE),
            "HEAD" => Some(MethodFilter::HEAD),
            "OPTIONS" => Some(MethodFilter::OPTIONS),
            _ => None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    Read(String, #[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("backend '{0}' is declared twice")]
    DuplicateBackend(String),

    #[error("route '{path}' references unknown backend '{backend}'")]
    UnknownBackend { path: String, backend: String },

    #[error("route '{path}' has unsupported HTTP method '{method}'")]
    UnsupportedMethod { path: String, method: String },

    #[error("timeout-secs must be greater than zero")]
    ZeroTimeout,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Read(path.display().to_string(), err))?;
        Self::from_toml(&source)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let mut names = HashSet::new();
        for backend in &self.backends {
            if !names.insert(backend.name.as_str()) {
                return Err(ConfigError::DuplicateBackend(backend.name.clone()));
            }
        }

        for route in &self.routes {
            if !names.contains(route.backend.as_str()) {
                return Err(ConfigError::UnknownBackend {
                    path: route.path.clone(),
                    backend: route.backend.clone(),
                });
            }
            if route.method_filter().is_none() {
                return Err(ConfigError::UnsupportedMethod {
                    path: route.path.clone(),
                    method: route.method.clone(),
                });
            }
        }

        Ok(())
    }
}
