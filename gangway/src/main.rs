//! # Gangway Entry Point
//!
//! The gateway binary: parses the CLI, loads the TOML configuration, binds
//! one lazy channel per backend, and serves the bridge router until ctrl-c.
mod auth;
mod cli;
mod config;
mod respond;
mod server;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use config::Config;
use gangway_core::reflection::client::ReflectionClient;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Channel;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    let bindings = server::bind_backends(&config).context("failed to set up backend channels")?;
    for (name, binding) in &bindings {
        announce_services(name, binding.channel.clone()).await;
    }

    let exchanger = auth::HttpTokenExchanger::new(config.interceptor.url.clone(), config.timeout())
        .context("failed to build the token exchange client")?;
    let router = server::build_router(&config, bindings, Arc::new(exchanger))?;

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

/// Best-effort startup log of what a backend exposes. The gateway still
/// serves when a backend is down, since channels connect lazily and schemas
/// are discovered per request.
async fn announce_services(name: &str, channel: Channel) {
    let mut client = ReflectionClient::new(channel);
    match tokio::time::timeout(Duration::from_secs(2), client.list_services()).await {
        Ok(Ok(services)) => info!(backend = name, ?services, "backend advertises services"),
        Ok(Err(err)) => warn!(backend = name, "could not list backend services: {err}"),
        Err(_) => warn!(backend = name, "backend did not answer the reflection probe"),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for the shutdown signal: {err}");
    }
}
