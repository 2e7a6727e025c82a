//! RACP protocol constants.
//!
//! These define the opcode, operator, filter, and status code values of
//! the record access control point as both profiles using it share them.

// ============================================================================
// Opcodes (client → peripheral)
// ============================================================================

/// Report stored records matching the operator.
pub const OP_CODE_REPORT_STORED_RECORDS: u8 = 1;
/// Delete stored records matching the operator.
pub const OP_CODE_DELETE_STORED_RECORDS: u8 = 2;
/// Abort the operation in progress.
pub const OP_CODE_ABORT_OPERATION: u8 = 3;
/// Report the number of stored records matching the operator.
pub const OP_CODE_REPORT_NUMBER_OF_RECORDS: u8 = 4;

// ============================================================================
// Opcodes (peripheral → client)
// ============================================================================

/// Response carrying a record count.
pub const OP_CODE_NUMBER_OF_RECORDS_RESPONSE: u8 = 5;
/// Generic response carrying the echoed request opcode and a status.
pub const OP_CODE_RESPONSE_CODE: u8 = 6;

// ============================================================================
// Operators
// ============================================================================

/// No operator (abort, responses).
pub const OPERATOR_NULL: u8 = 0;
/// All stored records.
pub const OPERATOR_ALL_RECORDS: u8 = 1;
/// Records with filter value less than or equal to the operand.
pub const OPERATOR_LESS_OR_EQUAL: u8 = 2;
/// Records with filter value greater than or equal to the operand.
pub const OPERATOR_GREATER_OR_EQUAL: u8 = 3;
/// Records with filter value within the two operands, inclusive.
pub const OPERATOR_WITHIN_RANGE: u8 = 4;
/// The first (oldest) stored record.
pub const OPERATOR_FIRST_RECORD: u8 = 5;
/// The last (newest) stored record.
pub const OPERATOR_LAST_RECORD: u8 = 6;

// ============================================================================
// Filter Types
// ============================================================================

/// Operands are record sequence numbers.
pub const FILTER_TYPE_SEQUENCE_NUMBER: u8 = 1;

// ============================================================================
// Status Codes
// ============================================================================

/// The request completed successfully.
pub const STATUS_SUCCESS: u8 = 1;
/// The request opcode is not supported by this peripheral.
pub const STATUS_OP_CODE_NOT_SUPPORTED: u8 = 2;
/// The operator is invalid for the request.
pub const STATUS_INVALID_OPERATOR: u8 = 3;
/// The operator is not supported by this peripheral.
pub const STATUS_OPERATOR_NOT_SUPPORTED: u8 = 4;
/// The operand is invalid for the request.
pub const STATUS_INVALID_OPERAND: u8 = 5;
/// No stored records match the request.
pub const STATUS_NO_RECORDS_FOUND: u8 = 6;
/// An abort request could not be honored.
pub const STATUS_ABORT_UNSUCCESSFUL: u8 = 7;
/// The procedure could not be completed.
pub const STATUS_PROCEDURE_NOT_COMPLETED: u8 = 8;
/// The operand is not supported by this peripheral.
pub const STATUS_OPERAND_NOT_SUPPORTED: u8 = 9;

// ============================================================================
// Sizes
// ============================================================================

/// Largest command frame: opcode + operator + filter type + two operands.
pub const MAX_OPERATION_SIZE: usize = 7;
