//! wordwire server binary.
//!
//! Usage: `wordwire-server <host> <port>` — binds and serves until
//! interrupted. The transform applied to each word is selected with
//! `--transform` (identity by default); a real deployment would inject its
//! own collaborator through the library seam instead.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wordwire::config::{ServerArgs, ServerConfig, TransformKind};
use wordwire::server::Server;
use wordwire::shutdown;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = ServerArgs::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        std::process::exit(1);
    });
    let config = ServerConfig::resolve(cli)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    shutdown::install()?;

    let server = Server::bind(&config)?;
    info!(
        host = %config.host,
        port = config.port,
        max_connections = config.max_connections,
        transform = ?config.transform,
        "Starting wordwire server"
    );

    server.run(builtin_transform(config.transform))?;
    Ok(())
}

/// Built-in stand-ins for the external transform collaborator.
fn builtin_transform(kind: TransformKind) -> impl FnMut(&str) -> String {
    move |word| match kind {
        TransformKind::Identity => word.to_string(),
        TransformKind::Uppercase => word.to_uppercase(),
        TransformKind::Reverse => word.chars().rev().collect(),
    }
}
