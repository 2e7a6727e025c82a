//! Binary codec for health-sensor payloads.
//!
//! Pure functions and small value types shared by the profile decoders:
//!
//! - **SFLOAT**: the 16-bit base-10 floating point format used for
//!   physiological sample values (4-bit signed exponent, 12-bit signed
//!   mantissa, reserved sentinels for NaN and the infinities)
//! - **Date-time**: the 7-byte calendar timestamp carried in measurement
//!   records
//! - **Bitfield flags**: helpers for the flags bytes that gate optional
//!   record fields, tolerant of reserved bits set by newer peripherals
//! - **[`ByteReader`]**: a bounds-checked cursor for walking
//!   variable-layout payloads
//!
//! Nothing in this crate holds state or performs I/O.

mod bits;
mod datetime;
mod error;
mod reader;
mod sfloat;

pub use bits::*;
pub use datetime::*;
pub use error::*;
pub use reader::*;
pub use sfloat::*;
