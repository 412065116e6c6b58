//! Settings file merged underneath the command-line flags.

use std::{
    fs,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use creepline_simulation::DEFAULT_SYNC_INTERVAL;
use serde::Deserialize;

const DEFAULT_PORT: u16 = 7777;
const DEFAULT_TICKS: u32 = 600;

/// Every setting the binary understands.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// Filter applied when `RUST_LOG` is unset.
    pub(crate) log_level: String,
    /// `server` subcommand settings.
    pub(crate) server: ServerConfig,
    /// `client` subcommand settings.
    pub(crate) client: ClientConfig,
}

/// Settings of the authoritative host.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    /// Address the listener binds.
    pub(crate) bind: SocketAddr,
    /// Ticks between two state syncs.
    pub(crate) sync_interval: u32,
}

/// Settings of the headless client.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ClientConfig {
    /// Whether to play against a server.
    pub(crate) multiplayer: bool,
    /// Server address used in multiplayer.
    pub(crate) connect: SocketAddr,
    /// Number of ticks to simulate before exiting.
    pub(crate) ticks: u32,
    /// Action script replayed during the session.
    pub(crate) script: Option<PathBuf>,
}

fn loopback() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            server: ServerConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: loopback(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            multiplayer: false,
            connect: loopback(),
            ticks: DEFAULT_TICKS,
            script: None,
        }
    }
}

impl Config {
    /// Reads the settings file, or returns the defaults when none is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = Config::parse("log_level = \"debug\"\n").expect("valid config");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.client.ticks, DEFAULT_TICKS);
        assert_eq!(config.server.bind.port(), DEFAULT_PORT);
    }

    #[test]
    fn sections_override_their_fields() {
        let config = Config::parse(
            r#"
            [server]
            bind = "0.0.0.0:9000"
            sync_interval = 3

            [client]
            multiplayer = true
            script = "scripts/opening.toml"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.server.sync_interval, 3);
        assert!(config.client.multiplayer);
        assert_eq!(config.client.connect, loopback());
        assert_eq!(
            config.client.script.as_deref(),
            Some(Path::new("scripts/opening.toml"))
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("[server]\nport = 1\n").is_err());
    }
}
