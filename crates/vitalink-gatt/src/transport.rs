//! The transport adapter contract.

use std::time::Duration;

use thiserror::Error;

use crate::attributes::Attribute;

/// Errors a transport adapter may return when a request cannot even be
/// issued. Failures of issued requests arrive asynchronously as events
/// with a non-zero status instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No link is established.
    #[error("transport is not connected")]
    NotConnected,

    /// A read, write, or descriptor write is already outstanding.
    #[error("an operation is already outstanding on this connection")]
    Busy,

    /// The adapter failed to accept the request.
    #[error("transport failure: {0}")]
    Failed(String),
}

/// The connection-oriented attribute transport a platform adapter
/// implements.
///
/// All methods are asynchronous requests: they return as soon as the
/// request is accepted, and the result arrives later as a
/// [`GattEvent`](crate::GattEvent). The adapter permits exactly one
/// outstanding [`read`](Transport::read), [`write`](Transport::write), or
/// descriptor write ([`set_notify`](Transport::set_notify) /
/// [`set_indicate`](Transport::set_indicate)) at a time.
///
/// Reconnection after an unexpected link loss, pairing dialogs, and any
/// retry/backoff policy belong to the adapter, not to the layers above.
pub trait Transport {
    /// Establish the link to the peripheral this transport is bound to.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Tear the link down.
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Start attribute discovery. Completion arrives as
    /// [`GattEvent::AttributesDiscovered`](crate::GattEvent::AttributesDiscovered).
    fn discover_attributes(&mut self) -> Result<(), TransportError>;

    /// Read an attribute value. Completion arrives as
    /// [`GattEvent::ReadComplete`](crate::GattEvent::ReadComplete).
    fn read(&mut self, attribute: &Attribute) -> Result<(), TransportError>;

    /// Write an attribute value. Completion arrives as
    /// [`GattEvent::WriteComplete`](crate::GattEvent::WriteComplete).
    fn write(&mut self, attribute: &Attribute, payload: &[u8]) -> Result<(), TransportError>;

    /// Enable or disable notifications for an attribute (a configuration
    /// descriptor write). Completion arrives as
    /// [`GattEvent::DescriptorWriteComplete`](crate::GattEvent::DescriptorWriteComplete).
    fn set_notify(&mut self, attribute: &Attribute, enabled: bool) -> Result<(), TransportError>;

    /// Enable or disable indications for an attribute (a configuration
    /// descriptor write). Completion arrives as
    /// [`GattEvent::DescriptorWriteComplete`](crate::GattEvent::DescriptorWriteComplete).
    fn set_indicate(&mut self, attribute: &Attribute, enabled: bool) -> Result<(), TransportError>;

    /// Arm a one-shot timer; expiry arrives as
    /// [`GattEvent::SettleTimerElapsed`](crate::GattEvent::SettleTimerElapsed).
    /// Keeps the layers above free of clocks.
    fn start_settle_timer(&mut self, delay: Duration) -> Result<(), TransportError>;
}
