//! Responses delivered on the record access control point.

use std::fmt;

use crate::constants::*;
use crate::error::RacpError;

/// Terminal status of a control-point request. A closed set; peripherals
/// reporting anything outside 1..=9 fail decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacpStatus {
    /// The request completed successfully.
    Success,
    /// The request opcode is not supported.
    OpCodeNotSupported,
    /// The operator is invalid for the request.
    InvalidOperator,
    /// The operator is not supported.
    OperatorNotSupported,
    /// The operand is invalid for the request.
    InvalidOperand,
    /// No stored records match the request.
    NoRecordsFound,
    /// An abort request could not be honored.
    AbortUnsuccessful,
    /// The procedure could not be completed.
    ProcedureNotCompleted,
    /// The operand is not supported.
    OperandNotSupported,
}

impl RacpStatus {
    /// Decode a wire status code.
    pub fn from_code(code: u8) -> Result<Self, RacpError> {
        match code {
            STATUS_SUCCESS => Ok(RacpStatus::Success),
            STATUS_OP_CODE_NOT_SUPPORTED => Ok(RacpStatus::OpCodeNotSupported),
            STATUS_INVALID_OPERATOR => Ok(RacpStatus::InvalidOperator),
            STATUS_OPERATOR_NOT_SUPPORTED => Ok(RacpStatus::OperatorNotSupported),
            STATUS_INVALID_OPERAND => Ok(RacpStatus::InvalidOperand),
            STATUS_NO_RECORDS_FOUND => Ok(RacpStatus::NoRecordsFound),
            STATUS_ABORT_UNSUCCESSFUL => Ok(RacpStatus::AbortUnsuccessful),
            STATUS_PROCEDURE_NOT_COMPLETED => Ok(RacpStatus::ProcedureNotCompleted),
            STATUS_OPERAND_NOT_SUPPORTED => Ok(RacpStatus::OperandNotSupported),
            other => Err(RacpError::UnknownStatus(other)),
        }
    }

    /// Wire code for this status.
    pub fn code(&self) -> u8 {
        match self {
            RacpStatus::Success => STATUS_SUCCESS,
            RacpStatus::OpCodeNotSupported => STATUS_OP_CODE_NOT_SUPPORTED,
            RacpStatus::InvalidOperator => STATUS_INVALID_OPERATOR,
            RacpStatus::OperatorNotSupported => STATUS_OPERATOR_NOT_SUPPORTED,
            RacpStatus::InvalidOperand => STATUS_INVALID_OPERAND,
            RacpStatus::NoRecordsFound => STATUS_NO_RECORDS_FOUND,
            RacpStatus::AbortUnsuccessful => STATUS_ABORT_UNSUCCESSFUL,
            RacpStatus::ProcedureNotCompleted => STATUS_PROCEDURE_NOT_COMPLETED,
            RacpStatus::OperandNotSupported => STATUS_OPERAND_NOT_SUPPORTED,
        }
    }
}

impl fmt::Display for RacpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RacpStatus::Success => write!(f, "success"),
            RacpStatus::OpCodeNotSupported => write!(f, "opcode not supported"),
            RacpStatus::InvalidOperator => write!(f, "invalid operator"),
            RacpStatus::OperatorNotSupported => write!(f, "operator not supported"),
            RacpStatus::InvalidOperand => write!(f, "invalid operand"),
            RacpStatus::NoRecordsFound => write!(f, "no records found"),
            RacpStatus::AbortUnsuccessful => write!(f, "abort unsuccessful"),
            RacpStatus::ProcedureNotCompleted => write!(f, "procedure not completed"),
            RacpStatus::OperandNotSupported => write!(f, "operand not supported"),
        }
    }
}

/// A decoded control-point response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacpResponse {
    /// Number-of-records response.
    Count(u16),

    /// Generic response to a request.
    Status {
        /// Echoed opcode of the request being answered.
        request: u8,
        /// Terminal status.
        status: RacpStatus,
    },
}

impl RacpResponse {
    /// Decode a control-point notification/indication payload.
    ///
    /// Layout: opcode, operator, then either a little-endian u16 count
    /// (opcode 5) or the echoed request opcode and a status code
    /// (opcode 6). The operator byte is ignored for forward tolerance.
    pub fn decode(payload: &[u8]) -> Result<Self, RacpError> {
        if payload.is_empty() {
            return Err(RacpError::ResponseTooShort {
                expected: 2,
                actual: 0,
            });
        }

        match payload[0] {
            OP_CODE_NUMBER_OF_RECORDS_RESPONSE => {
                if payload.len() < 4 {
                    return Err(RacpError::ResponseTooShort {
                        expected: 4,
                        actual: payload.len(),
                    });
                }
                let count = u16::from_le_bytes([payload[2], payload[3]]);
                Ok(RacpResponse::Count(count))
            }

            OP_CODE_RESPONSE_CODE => {
                if payload.len() < 4 {
                    return Err(RacpError::ResponseTooShort {
                        expected: 4,
                        actual: payload.len(),
                    });
                }
                Ok(RacpResponse::Status {
                    request: payload[2],
                    status: RacpStatus::from_code(payload[3])?,
                })
            }

            other => Err(RacpError::UnknownOpcode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_count_response() {
        let response = RacpResponse::decode(&[5, 0, 0x2A, 0x00]).unwrap();
        assert_eq!(response, RacpResponse::Count(42));

        let response = RacpResponse::decode(&[5, 0, 0x34, 0x12]).unwrap();
        assert_eq!(response, RacpResponse::Count(0x1234));
    }

    #[test]
    fn test_decode_status_response() {
        let response = RacpResponse::decode(&[6, 0, 1, 1]).unwrap();
        assert_eq!(
            response,
            RacpResponse::Status {
                request: 1,
                status: RacpStatus::Success,
            }
        );

        let response = RacpResponse::decode(&[6, 0, 1, 6]).unwrap();
        assert_eq!(
            response,
            RacpResponse::Status {
                request: 1,
                status: RacpStatus::NoRecordsFound,
            }
        );
    }

    #[test]
    fn test_decode_rejects_short_frames() {
        assert!(matches!(
            RacpResponse::decode(&[]),
            Err(RacpError::ResponseTooShort { .. })
        ));
        assert!(matches!(
            RacpResponse::decode(&[5, 0, 1]),
            Err(RacpError::ResponseTooShort { .. })
        ));
        assert!(matches!(
            RacpResponse::decode(&[6, 0]),
            Err(RacpError::ResponseTooShort { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_codes() {
        assert_eq!(
            RacpResponse::decode(&[9, 0, 0, 0]),
            Err(RacpError::UnknownOpcode(9))
        );
        assert_eq!(
            RacpResponse::decode(&[6, 0, 1, 10]),
            Err(RacpError::UnknownStatus(10))
        );
    }

    #[test]
    fn test_status_codes_round_trip() {
        for code in 1..=9u8 {
            let status = RacpStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
    }
}
