//! Error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("process {0} not found")]
    ProcessNotFound(u32),

    #[error("failed to start probe {probe}: {source}")]
    ProbeSpawn {
        probe: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single probe line could not be folded into its accumulator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("expected at least {expected} fields, got {got}")]
    TooFewFields { expected: usize, got: usize },

    #[error("field {index} is not a number: {value:?}")]
    BadNumber { index: usize, value: String },

    #[error("field {index} overflows the running total")]
    Overflow { index: usize },
}
