//! Record Access Control Point (RACP) protocol.
//!
//! RACP is the request/response protocol health sensors expose for
//! paginated retrieval of historical records from peripheral storage. The
//! client writes a command to the control-point characteristic; the
//! peripheral streams back zero or more value notifications (one or more
//! records each) and then exactly one terminal control-point indication.
//!
//! # Wire Overview
//!
//! Commands (client → peripheral, control-point write):
//!
//! ```text
//! +--------+----------+-------------+------------+------------+
//! | opcode | operator | filter type | operand lo | operand hi |
//! +--------+----------+-------------+------------+------------+
//!     1        1        only for operand-bearing operators
//! ```
//!
//! Responses (peripheral → client, control-point notification/indication):
//!
//! - **Count response** (opcode 5): operator, then a little-endian u16
//!   record count
//! - **Generic response** (opcode 6): operator, the echoed request opcode,
//!   then a status code
//!
//! # Example
//!
//! ```rust,ignore
//! use vitalink_racp::{RacpEngine, RacpOperation};
//!
//! // Build a command
//! let op = RacpOperation::report_greater_or_equal(42);
//! let frame = op.encode();
//!
//! // Drive a fetch
//! engine.fetch_all(&mut transport)?;
//! ```
//!
//! The [`RacpEngine`] drives one fetch at a time to completion; the
//! [`RecordStore`] holds what the fetch produced, ordered by the
//! peripheral-assigned sequence number.

mod constants;
mod engine;
mod error;
mod operation;
mod response;
mod store;

pub use constants::*;
pub use engine::*;
pub use error::*;
pub use operation::*;
pub use response::*;
pub use store::*;
