use shared::{GridSizeError, MAX_NICKNAME_LEN};
use std::net::AddrParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Grid(#[from] GridSizeError),

    #[error("invalid nickname {0:?}: must be 1-{max} characters and contain none of <>/\\{{}}[]", max = MAX_NICKNAME_LEN)]
    InvalidNickname(String),

    #[error("tick interval must be at least 1ms")]
    ZeroTickInterval,

    #[error("invalid server address {addr:?}: {source}")]
    ServerAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid state snapshot: {0}")]
    InvalidSnapshot(&'static str),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GridSizeError> for ClientError {
    fn from(err: GridSizeError) -> Self {
        ClientError::Config(ConfigError::Grid(err))
    }
}
