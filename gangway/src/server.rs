//! # HTTP Server
//!
//! Builds the axum router from the configured route mappings and drives the
//! bridge pipeline for each request: exchange the credential, propagate
//! metadata, materialize the request document, invoke the backend method,
//! translate the outcome. The whole pipeline runs under one per-request
//! deadline, started before the exchange.
use crate::auth::{self, AuthError, TokenExchanger};
use crate::config::{Config, ConfigError};
use crate::respond;
use axum::{
    Router,
    body::Bytes,
    extract::{Query, RawPathParams},
    http::{HeaderMap, header},
    response::Response,
    routing::{get, on},
};
use gangway_core::{
    descriptor::ReflectionSource,
    document,
    invoke::{CallOutcome, Invoker},
    metadata,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tonic::{
    Code,
    transport::{Channel, Endpoint},
};
use tower_http::trace::TraceLayer;

/// One configured backend: the shared channel, its reflection-backed invoker,
/// and the service namespace calls are addressed to.
pub struct Binding {
    pub service: String,
    pub channel: Channel,
    pub invoker: Invoker<ReflectionSource<Channel>, Channel>,
}

/// Builds one lazily connecting binding per configured backend. Channels are
/// created once here and shared by every request for the process lifetime.
pub fn bind_backends(
    config: &Config,
) -> Result<HashMap<String, Binding>, tonic::transport::Error> {
    let mut bindings = HashMap::new();
    for backend in &config.backends {
        let channel = Endpoint::new(backend.addr.clone())?.connect_lazy();
        bindings.insert(
            backend.name.clone(),
            Binding {
                service: backend.service.clone(),
                channel: channel.clone(),
                invoker: Invoker::new(ReflectionSource::new(channel.clone()), channel),
            },
        );
    }
    Ok(bindings)
}

#[derive(Clone)]
struct AppState {
    bindings: Arc<HashMap<String, Binding>>,
    exchanger: Arc<dyn TokenExchanger>,
    deadline: Duration,
}

#[derive(Clone)]
struct RouteTarget {
    backend: String,
    rpc: String,
}

/// Builds the router: one route per configured mapping plus a health probe.
pub fn build_router(
    config: &Config,
    bindings: HashMap<String, Binding>,
    exchanger: Arc<dyn TokenExchanger>,
) -> Result<Router, ConfigError> {
    let state = AppState {
        bindings: Arc::new(bindings),
        exchanger,
        deadline: config.timeout(),
    };

    let mut router = Router::new().route("/healthz", get(|| async { "ok" }));

    for route in &config.routes {
        let filter = route
            .method_filter()
            .ok_or_else(|| ConfigError::UnsupportedMethod {
                path: route.path.clone(),
                method: route.method.clone(),
            })?;
        let target = RouteTarget {
            backend: route.backend.clone(),
            rpc: route.rpc.clone(),
        };
        let state = state.clone();
        let handler = move |params: RawPathParams,
                            Query(query): Query<Vec<(String, String)>>,
                            headers: HeaderMap,
                            body: Bytes| {
            bridge(state, target, params, query, headers, body)
        };
        router = router.route(&route.path, on(filter, handler));
    }

    Ok(router.layer(TraceLayer::new_for_http()))
}

/// Entry point for one bridged request. The deadline covers credential
/// exchange, schema discovery, and the backend call combined; expiry yields
/// a translated unavailability failure instead of a hanging response.
async fn bridge(
    state: AppState,
    target: RouteTarget,
    params: RawPathParams,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let deadline = state.deadline;
    let pipeline = run(state, target, params, query, headers, body);
    match tokio::time::timeout(deadline, pipeline).await {
        Ok(response) => response,
        Err(_) => respond::translate(CallOutcome::failure(
            Code::Unavailable,
            format!("request deadline of {}ms exceeded", deadline.as_millis()),
        )),
    }
}

async fn run(
    state: AppState,
    target: RouteTarget,
    params: RawPathParams,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = tokio::time::Instant::now();

    let Some(binding) = state.bindings.get(&target.backend) else {
        // Config validation rejects dangling route references, so a request
        // can only get here if the router and bindings went out of sync.
        return respond::translate(CallOutcome::failure(
            Code::Internal,
            format!("no binding for backend '{}'", target.backend),
        ));
    };

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = match auth::strip_scheme(bearer) {
        Ok(token) => token,
        Err(err) => return unauthorized(&err),
    };
    let credential = match state.exchanger.exchange(token).await {
        Ok(credential) => credential,
        Err(err) => return unauthorized(&err),
    };

    let call_metadata = metadata::propagate(&headers, &credential);
    let path_params: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let doc = document::build(&path_params, &query, &body);

    let remaining = state.deadline.saturating_sub(started.elapsed());
    let outcome = binding
        .invoker
        .invoke(&binding.service, &target.rpc, doc, call_metadata, remaining)
        .await;

    respond::translate(outcome)
}

fn unauthorized(err: &AuthError) -> Response {
    // The error text, not the token, is safe to log.
    tracing::warn!("authorization failed: {err}");
    respond::translate(CallOutcome::failure(Code::Unauthenticated, "invalid token"))
}

#[cfg(test)]
mod gateway_test;
