use thiserror::Error;

use crate::resource::ResourceKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("failed to convert {field}({value}) to float64")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} must be a positive finite number, got {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("both ID and Name can't be nil for {0} reference")]
    EmptyReference(ResourceKind),
}
