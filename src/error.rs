use std::{collections::TryReserveError, fmt, io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {0}")]
    Args(#[from] pico_args::Error),

    #[error("missing mandatory argument {0}")]
    MissingArgument(&'static str),

    #[error("unrecognized arguments: {0:?}")]
    UnusedArguments(Vec<String>),

    #[error("trace line {line}: {reason} in {text:?}")]
    TraceFormat {
        line: usize,
        text: String,
        reason: TraceFormatReason,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("out of memory allocating {what}")]
    ResourceExhausted {
        what: &'static str,
        #[source]
        source: Option<TryReserveError>,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("associativity E must be at least 1")]
    ZeroAssociativity,

    #[error("s = {s} and b = {b} address more than 64 bits")]
    AddressBits { s: u32, b: u32 },

    #[error("layout lists no caches")]
    EmptyLayout,

    #[error("cache {name:?}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceFormatReason {
    /// Not of the form `<L|S> <addr>,<size>`.
    Shape,
    Address(String),
    Size(String),
}

impl fmt::Display for TraceFormatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceFormatReason::Shape => write!(f, "invalid trace format"),
            TraceFormatReason::Address(tok) => write!(f, "invalid address {tok:?}"),
            TraceFormatReason::Size(tok) => write!(f, "invalid size {tok:?}"),
        }
    }
}
