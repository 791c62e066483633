//! Command line arguments and the validated client configuration built from them

use crate::error::ConfigError;
use clap::Parser;
use shared::{is_valid_nickname, DEFAULT_TICK_MS};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    pub server: String,

    /// Nickname to request; the server may rewrite it
    #[arg(short = 'n', long, default_value = "Guest")]
    pub nickname: String,

    /// Milliseconds between game ticks
    #[arg(short = 't', long, default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    pub fake_ping: u64,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    pub width: u32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_addr: SocketAddr,
    pub nickname: String,
    pub tick_interval: Duration,
    pub fake_ping: Duration,
    pub window_width: u32,
    pub window_height: u32,
}

impl TryFrom<Args> for ClientConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let server_addr = args
            .server
            .parse()
            .map_err(|source| ConfigError::ServerAddress {
                addr: args.server.clone(),
                source,
            })?;

        if !is_valid_nickname(&args.nickname) {
            return Err(ConfigError::InvalidNickname(args.nickname));
        }

        if args.tick_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }

        Ok(ClientConfig {
            server_addr,
            nickname: args.nickname,
            tick_interval: Duration::from_millis(args.tick_ms),
            fake_ping: Duration::from_millis(args.fake_ping),
            window_width: args.width,
            window_height: args.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<ClientConfig, ConfigError> {
        let args = Args::try_parse_from(argv).expect("arguments should parse");
        ClientConfig::try_from(args)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["client"]).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.nickname, "Guest");
        assert_eq!(config.tick_interval, Duration::from_millis(70));
        assert_eq!(config.fake_ping, Duration::ZERO);
        assert_eq!((config.window_width, config.window_height), (800, 600));
    }

    #[test]
    fn test_explicit_arguments() {
        let config = parse(&[
            "client", "-s", "10.0.0.2:9000", "-n", "viper", "-t", "100", "-l", "40",
        ])
        .unwrap();
        assert_eq!(config.server_addr, "10.0.0.2:9000".parse().unwrap());
        assert_eq!(config.nickname, "viper");
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.fake_ping, Duration::from_millis(40));
    }

    #[test]
    fn test_rejects_bad_server_address() {
        let err = parse(&["client", "--server", "not-an-address"]).unwrap_err();
        assert!(matches!(err, ConfigError::ServerAddress { .. }));
    }

    #[test]
    fn test_rejects_bad_nickname() {
        let err = parse(&["client", "--nickname", "<b>"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNickname(_)));
    }

    #[test]
    fn test_rejects_zero_tick() {
        let err = parse(&["client", "--tick-ms", "0"]).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTickInterval));
    }
}
