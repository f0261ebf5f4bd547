use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrcError {
    /// The line did not match the RFC 2812 message grammar.
    #[error("malformed message: '{0}'")]
    Parse(String),

    /// A client pushed more than 512 bytes without a line terminator.
    #[error("message exceeds the 512 byte line limit")]
    LineTooLong,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse configuration file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot bind to {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot install signal handler")]
    Signal(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
