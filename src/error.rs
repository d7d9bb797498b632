use crate::{config::EventTimeFormat, types::EventId};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Failed to encode a device event ({0})")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid configuration ({0})")]
    Config(#[from] serde_yaml::Error),

    #[error("Encountered a frame of {len} bytes, exceeding the maximum frame length of {max}")]
    FrameTooLong { len: usize, max: usize },

    #[error(
        "Encountered and IO error while reading the input stream ({})",
        .0.kind()
    )]
    Io(#[from] io::Error),
}

/// The decoded or constructed values violate a device event invariant.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Event time '{value}' does not match the {format} convention")]
    InvalidEventTime {
        value: String,
        format: EventTimeFormat,
    },

    #[error("Parameter '{path}' can't be serialized ({reason})")]
    NonSerializableParam { path: String, reason: &'static str },

    #[error("Parameter '{path}' exceeds the maximum nesting depth of {max_depth}")]
    ParasTooDeep { path: String, max_depth: usize },

    #[error("Event ID '{0}' is already in flight")]
    DuplicateEventId(EventId),

    #[error("An event report must carry at least one service event")]
    EmptyReport,

    #[error("Service event {index} is invalid: {source}")]
    Service {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

/// The input is not well-formed device event data.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Malformed input ({0})")]
    Malformed(#[from] serde_json::Error),

    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

impl ValidationError {
    pub(crate) fn in_service(self, index: usize) -> Self {
        ValidationError::Service {
            index,
            source: Box::new(self),
        }
    }
}

impl FormatError {
    pub(crate) fn not_an_object(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        FormatError::NotAnObject(match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        })
    }
}
