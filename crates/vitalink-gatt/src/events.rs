//! Events delivered by the transport adapter.

use uuid::Uuid;

use crate::attributes::AttributeTable;
use crate::state::BondState;

// ============================================================================
// Transport Status Codes
// ============================================================================

/// Operation completed successfully.
pub const STATUS_SUCCESS: u8 = 0x00;
/// The link requires authentication the current bond cannot provide.
pub const STATUS_INSUFFICIENT_AUTHENTICATION: u8 = 0x05;
/// The link requires encryption the current bond cannot provide.
pub const STATUS_INSUFFICIENT_ENCRYPTION: u8 = 0x0F;
/// Catch-all transport failure reported by some stacks.
pub const STATUS_UNKNOWN_ERROR: u8 = 0x85;

/// Whether a completion status signals a stale or missing bond rather
/// than a protocol failure.
pub fn is_authentication_failure(status: u8) -> bool {
    status == STATUS_INSUFFICIENT_AUTHENTICATION || status == STATUS_INSUFFICIENT_ENCRYPTION
}

// ============================================================================
// Events
// ============================================================================

/// An asynchronous event from the transport adapter.
///
/// Events arrive on a single cooperative delivery sequence per connection.
/// Payloads are immutable buffers passed by value; the adapter must not
/// reuse them after delivery.
#[derive(Debug, Clone)]
pub enum GattEvent {
    /// The link to the peripheral came up.
    Connected,

    /// The link dropped. `reason` is the transport's status code, surfaced
    /// verbatim; 0 means a locally requested disconnect completed.
    Disconnected {
        /// Transport status code.
        reason: u8,
    },

    /// The settle timer requested via
    /// [`Transport::start_settle_timer`](crate::Transport::start_settle_timer)
    /// elapsed.
    SettleTimerElapsed,

    /// Attribute discovery finished.
    AttributesDiscovered {
        /// Transport status code; 0 on success.
        status: u8,
        /// Discovered attributes. Empty when `status != 0`.
        attributes: AttributeTable,
    },

    /// A read issued via [`Transport::read`](crate::Transport::read)
    /// completed.
    ReadComplete {
        /// Characteristic that was read.
        attribute: Uuid,
        /// Value bytes; empty when `status != 0`.
        value: Vec<u8>,
        /// Transport status code.
        status: u8,
    },

    /// A write issued via [`Transport::write`](crate::Transport::write)
    /// completed.
    WriteComplete {
        /// Characteristic that was written.
        attribute: Uuid,
        /// Transport status code.
        status: u8,
    },

    /// A notification/indication enable (a descriptor write) completed.
    DescriptorWriteComplete {
        /// Characteristic whose configuration descriptor was written.
        attribute: Uuid,
        /// Transport status code.
        status: u8,
    },

    /// An unsolicited value notification or indication arrived.
    ValueChanged {
        /// Source characteristic.
        attribute: Uuid,
        /// Value bytes.
        value: Vec<u8>,
    },

    /// The pairing state changed.
    BondStateChanged {
        /// New bond state.
        state: BondState,
    },
}
