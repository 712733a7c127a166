use std::{io, num::ParseIntError};

use thiserror::Error;

/// Everything that can stop a count run. None of these are recovered from.
#[derive(Error, Debug)]
pub enum CountError {
    #[error("missing configuration: environment variable {0} is not set")]
    MissingConfiguration(&'static str),

    #[error("invalid configuration: environment variable {0} is not valid unicode")]
    NotUnicode(&'static str),

    #[error("invalid port {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid host {host:?}: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },

    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    #[error("index {0} not found")]
    IndexNotFound(String),

    #[error("invalid count response: {0}")]
    InvalidResponse(String),

    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

impl CountError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionFailure(msg.into())
    }
}

impl From<opensearch::Error> for CountError {
    fn from(e: opensearch::Error) -> Self {
        Self::connection(e.to_string())
    }
}
