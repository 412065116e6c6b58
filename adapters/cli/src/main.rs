#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that hosts or plays creepline sessions.

mod config;
mod script;
mod session;

use std::{net::SocketAddr, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Headless creepline server and scripted client.
#[derive(Debug, Parser)]
#[command(name = "creepline", version)]
struct Cli {
    /// TOML file providing defaults for every flag.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Host game instances for network clients.
    Server {
        /// Address to listen on.
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Ticks between two state syncs.
        #[arg(long)]
        sync_interval: Option<u32>,
    },
    /// Play a scripted session without a window.
    Client {
        /// Play against a server instead of locally.
        #[arg(long)]
        multiplayer: bool,
        /// Server address used with `--multiplayer`.
        #[arg(long)]
        connect: Option<SocketAddr>,
        /// Number of ticks to simulate.
        #[arg(long)]
        ticks: Option<u32>,
        /// Action script to replay.
        #[arg(long)]
        script: Option<PathBuf>,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Entry point for the creepline command-line interface.
fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Server {
            bind,
            sync_interval,
        } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(sync_interval) = sync_interval {
                config.server.sync_interval = sync_interval;
            }
            session::serve(&config.server)
        }
        Commands::Client {
            multiplayer,
            connect,
            ticks,
            script,
        } => {
            config.client.multiplayer |= multiplayer;
            if let Some(connect) = connect {
                config.client.connect = connect;
            }
            if let Some(ticks) = ticks {
                config.client.ticks = ticks;
            }
            if script.is_some() {
                config.client.script = script;
            }
            session::play(&config.client)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_line_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "creepline",
            "server",
            "--sync-interval",
            "3",
            "--log-level",
            "debug",
        ])
        .expect("valid arguments");
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Server {
                bind,
                sync_interval,
            } => {
                assert_eq!(bind, None);
                assert_eq!(sync_interval, Some(3));
            }
            Commands::Client { .. } => panic!("expected the server subcommand"),
        }
    }
}
