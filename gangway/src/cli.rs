use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Schema-free HTTP/JSON gateway for gRPC backends.
///
/// Backend method shapes are discovered at run time through gRPC server
/// reflection, so backends can add or change methods without the gateway
/// being rebuilt. Routes, backends, and the token-exchange endpoint come
/// from the configuration file.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Path to the gateway configuration file (TOML).
    #[arg(long, short, value_name = "FILE")]
    pub config: PathBuf,

    /// Override the listen address from the configuration file.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,
}
