//! wordwire client binary.
//!
//! Usage: `wordwire-client <host> <port> <word>` — sends the word, prints
//! the transformed reply to stdout. Diagnostics go to stderr so the
//! payload stays pipeable.

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use wordwire::client;
use wordwire::config::ClientArgs;
use wordwire::shutdown;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ClientArgs::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        std::process::exit(1);
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    shutdown::install()?;

    match client::run(&args.host, args.port, &args.word)? {
        Some(reply) => println!("{reply}"),
        None => warn!("Connection closed before a full reply arrived"),
    }
    Ok(())
}
