//! Initialization operations issued against the transport.

use crate::attributes::Attribute;
use crate::transport::{Transport, TransportError};

/// One step of connection initialization.
///
/// Immutable once built; the initialization queue consumes each operation
/// exactly once, in FIFO order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Read the attribute's value.
    Read(Attribute),
    /// Write a payload to the attribute.
    Write(Attribute, Vec<u8>),
    /// Enable notifications on the attribute.
    EnableNotify(Attribute),
    /// Enable indications on the attribute.
    EnableIndicate(Attribute),
}

impl Operation {
    /// The attribute this operation targets.
    pub fn attribute(&self) -> &Attribute {
        match self {
            Operation::Read(attr) => attr,
            Operation::Write(attr, _) => attr,
            Operation::EnableNotify(attr) => attr,
            Operation::EnableIndicate(attr) => attr,
        }
    }

    /// Issue this operation against the transport.
    pub fn issue<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<(), TransportError> {
        match self {
            Operation::Read(attr) => transport.read(attr),
            Operation::Write(attr, payload) => transport.write(attr, payload),
            Operation::EnableNotify(attr) => transport.set_notify(attr, true),
            Operation::EnableIndicate(attr) => transport.set_indicate(attr, true),
        }
    }
}
