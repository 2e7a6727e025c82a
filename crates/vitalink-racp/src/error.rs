//! RACP protocol error types.

use thiserror::Error;
use vitalink_gatt::TransportError;

/// Errors that can occur when working with the record access protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RacpError {
    /// Response frame is too short to be valid.
    #[error("response too short: expected at least {expected} bytes, got {actual}")]
    ResponseTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Unknown response opcode.
    #[error("unknown response opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// Status code outside the defined 1..=9 set.
    #[error("unknown status code: {0}")]
    UnknownStatus(u8),

    /// A fetch is already in flight on this connection.
    #[error("a record operation is already in progress")]
    Busy,

    /// The control-point write could not be issued.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
