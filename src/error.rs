//! Error types for the glucose analytics engine
//!
//! Only unexpected input (malformed timestamps, config values, I/O) is an
//! error. Empty reading sets and missing configuration are not: they yield
//! empty results or disabled detectors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlucoseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid clock time for {key}: {value}")]
    InvalidClockTime { key: String, value: String },

    #[error("Invalid number for {key}: {value}")]
    InvalidNumber { key: String, value: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
}
