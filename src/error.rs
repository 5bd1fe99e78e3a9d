use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Usage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("input file {} not found", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed input: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("malformed input at line {line}: {source}")]
    ParseLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record {record} is missing required field `{field}`")]
    MissingField { record: Location, field: &'static str },

    #[error("record {record} has an invalid temperature {value:?}")]
    InvalidTemperature { record: Location, value: String },

    #[error("sensor {0} has no readings")]
    NoData(String),

    #[error("unable to encode report: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Error {
    /// Process exit status reported for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Usage(_) | Error::Config(_) => 2,
            Error::FileNotFound(_) => 3,
            Error::Io { .. } => 4,
            Error::Parse(_)
            | Error::ParseLine { .. }
            | Error::MissingField { .. }
            | Error::InvalidTemperature { .. } => 5,
            Error::NoData(_) => 6,
            Error::Encode(_) => 1,
        }
    }

    /// Line of the input the error points at, if any. Errors without a line sort last.
    pub fn position(&self) -> usize {
        match self {
            Error::ParseLine { line, .. }
            | Error::MissingField {
                record: Location::Line(line),
                ..
            }
            | Error::InvalidTemperature {
                record: Location::Line(line),
                ..
            } => *line,
            _ => usize::MAX,
        }
    }
}

/// Where a record sits in the input: array index for JSON documents, line number for JSON Lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Index(usize),
    Line(usize),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Index(index) => write!(f, "#{}", index),
            Location::Line(line) => write!(f, "line {}", line),
        }
    }
}
