//! Configuration for the wordwire binaries.
//!
//! The server takes `<host> <port>` plus optional flags and an optional
//! TOML configuration file; CLI arguments take precedence over file values.
//! The client takes `<host> <port> <word>`. Both exit with code 1 on a bad
//! argument list.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

/// Built-in transforms selectable for the server binary.
///
/// The library seam is a plain `FnMut(&str) -> String`; these stand in for
/// an external collaborator when running standalone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Identity,
    Uppercase,
    Reverse,
}

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "wordwire-server")]
#[command(version = "0.1.0")]
#[command(about = "A framed TCP text-transform server", long_about = None)]
pub struct ServerArgs {
    /// Address to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of simultaneous connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Transform applied to each received word
    #[arg(long, value_enum)]
    pub transform: Option<TransformKind>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Command-line arguments for the client
#[derive(Parser, Debug)]
#[command(name = "wordwire-client")]
#[command(version = "0.1.0")]
#[command(about = "Send one word to a wordwire server and print the reply", long_about = None)]
pub struct ClientArgs {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Word to send
    pub word: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Maximum number of simultaneous connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Transform applied to each received word
    pub transform: Option<TransformKind>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            transform: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_max_connections() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    pub transform: TransformKind,
    pub log_level: String,
}

impl ServerConfig {
    /// Merge CLI args with an optional TOML file; CLI takes precedence.
    pub fn resolve(cli: ServerArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(ServerConfig {
            host: cli.host,
            port: cli.port,
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            transform: cli
                .transform
                .or(toml_config.server.transform)
                .unwrap_or(TransformKind::Identity),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        resolve_addr(&self.host, self.port)
    }
}

/// Resolve a host name or address plus port to a socket address.
pub fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| ConfigError::AddrResolve(host.to_string(), port, e))?
        .next()
        .ok_or_else(|| {
            ConfigError::AddrResolve(
                host.to_string(),
                port,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved"),
            )
        })
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    AddrResolve(String, u16, std::io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::AddrResolve(host, port, e) => {
                write!(f, "Failed to resolve '{}:{}': {}", host, port, e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.max_connections, 1024);
        assert!(config.server.transform.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            max_connections = 64
            transform = "uppercase"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.max_connections, 64);
        assert_eq!(config.server.transform, Some(TransformKind::Uppercase));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_takes_precedence() {
        let cli = ServerArgs::parse_from([
            "wordwire-server",
            "127.0.0.1",
            "9000",
            "--max-connections",
            "8",
            "--transform",
            "reverse",
        ]);
        let config = ServerConfig::resolve(cli).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.transform, TransformKind::Reverse);
    }

    #[test]
    fn test_wrong_argument_count_is_rejected() {
        assert!(ServerArgs::try_parse_from(["wordwire-server", "127.0.0.1"]).is_err());
        assert!(ClientArgs::try_parse_from(["wordwire-client", "127.0.0.1", "9000"]).is_err());
    }

    #[test]
    fn test_resolve_loopback() {
        let addr = resolve_addr("127.0.0.1", 9000).unwrap();
        assert_eq!(addr.port(), 9000);
        assert!(addr.ip().is_loopback());
    }
}
