//! Commands written to the record access control point.

use bytes::BufMut;

use crate::constants::*;

/// Request opcodes a client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacpOpcode {
    /// Report stored records.
    ReportRecords,
    /// Delete stored records.
    DeleteRecords,
    /// Abort the operation in progress.
    Abort,
    /// Report the number of stored records.
    ReportCount,
}

impl RacpOpcode {
    /// Wire code for this opcode.
    pub fn code(&self) -> u8 {
        match self {
            RacpOpcode::ReportRecords => OP_CODE_REPORT_STORED_RECORDS,
            RacpOpcode::DeleteRecords => OP_CODE_DELETE_STORED_RECORDS,
            RacpOpcode::Abort => OP_CODE_ABORT_OPERATION,
            RacpOpcode::ReportCount => OP_CODE_REPORT_NUMBER_OF_RECORDS,
        }
    }
}

/// Record selection operator, with its operands where the operator takes
/// any. Operands are sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacpOperator {
    /// No selection (abort only).
    Null,
    /// All stored records.
    All,
    /// Records with sequence number less than or equal to the bound.
    LessOrEqual(u16),
    /// Records with sequence number greater than or equal to the bound.
    GreaterOrEqual(u16),
    /// Records with sequence number within the bounds, inclusive.
    Range(u16, u16),
    /// The first (oldest) stored record.
    First,
    /// The last (newest) stored record.
    Last,
}

impl RacpOperator {
    /// Wire code for this operator.
    pub fn code(&self) -> u8 {
        match self {
            RacpOperator::Null => OPERATOR_NULL,
            RacpOperator::All => OPERATOR_ALL_RECORDS,
            RacpOperator::LessOrEqual(_) => OPERATOR_LESS_OR_EQUAL,
            RacpOperator::GreaterOrEqual(_) => OPERATOR_GREATER_OR_EQUAL,
            RacpOperator::Range(_, _) => OPERATOR_WITHIN_RANGE,
            RacpOperator::First => OPERATOR_FIRST_RECORD,
            RacpOperator::Last => OPERATOR_LAST_RECORD,
        }
    }
}

/// A complete control-point command. Immutable: built once, encoded once,
/// and tracked until its matching response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RacpOperation {
    /// Request opcode.
    pub opcode: RacpOpcode,
    /// Record selection operator.
    pub operator: RacpOperator,
}

impl RacpOperation {
    /// Report all stored records.
    pub fn report_all() -> Self {
        RacpOperation {
            opcode: RacpOpcode::ReportRecords,
            operator: RacpOperator::All,
        }
    }

    /// Report the first (oldest) stored record.
    pub fn report_first() -> Self {
        RacpOperation {
            opcode: RacpOpcode::ReportRecords,
            operator: RacpOperator::First,
        }
    }

    /// Report the last (newest) stored record.
    pub fn report_last() -> Self {
        RacpOperation {
            opcode: RacpOpcode::ReportRecords,
            operator: RacpOperator::Last,
        }
    }

    /// Report records with sequence numbers at or above `sequence`.
    pub fn report_greater_or_equal(sequence: u16) -> Self {
        RacpOperation {
            opcode: RacpOpcode::ReportRecords,
            operator: RacpOperator::GreaterOrEqual(sequence),
        }
    }

    /// Delete all stored records.
    pub fn delete_all() -> Self {
        RacpOperation {
            opcode: RacpOpcode::DeleteRecords,
            operator: RacpOperator::All,
        }
    }

    /// Abort the operation in progress. Abort always carries the null
    /// operator.
    pub fn abort() -> Self {
        RacpOperation {
            opcode: RacpOpcode::Abort,
            operator: RacpOperator::Null,
        }
    }

    /// Report the number of stored records.
    pub fn report_count_all() -> Self {
        RacpOperation {
            opcode: RacpOpcode::ReportCount,
            operator: RacpOperator::All,
        }
    }

    /// Encode the command to its wire frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_OPERATION_SIZE);
        buf.push(self.opcode.code());
        buf.push(self.operator.code());

        match self.operator {
            RacpOperator::LessOrEqual(bound) | RacpOperator::GreaterOrEqual(bound) => {
                buf.push(FILTER_TYPE_SEQUENCE_NUMBER);
                buf.put_u16_le(bound);
            }
            RacpOperator::Range(low, high) => {
                buf.push(FILTER_TYPE_SEQUENCE_NUMBER);
                buf.put_u16_le(low);
                buf.put_u16_le(high);
            }
            RacpOperator::Null
            | RacpOperator::All
            | RacpOperator::First
            | RacpOperator::Last => {}
        }

        buf
    }
}
