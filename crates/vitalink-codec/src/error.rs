//! Error types for payload decoding.

use thiserror::Error;

/// Errors that can occur while decoding a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The payload ended before a field could be read.
    #[error("truncated payload at offset {offset}: needed {needed} more byte(s)")]
    Truncated {
        /// Offset where the read was attempted.
        offset: usize,
        /// Bytes missing to satisfy the read.
        needed: usize,
    },

    /// A decoded field value is outside its valid range.
    #[error("{field} out of range: {value}")]
    FieldOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Decoded value.
        value: u32,
    },
}

impl CodecError {
    /// Create a truncation error.
    pub fn truncated(offset: usize, needed: usize) -> Self {
        CodecError::Truncated { offset, needed }
    }

    /// Create an out-of-range error.
    pub fn out_of_range(field: &'static str, value: u32) -> Self {
        CodecError::FieldOutOfRange { field, value }
    }
}
