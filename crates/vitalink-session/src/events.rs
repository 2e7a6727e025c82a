//! Events the session reports to its caller.

use vitalink_racp::FetchOutcome;

use crate::error::SessionError;

/// An outbound session event.
///
/// Everything the session has to say arrives through these; no call
/// into the session blocks waiting for a result.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Discovery and initialization finished; record operations may
    /// begin. Fired exactly once per initialization.
    Ready,

    /// The link closed: either a locally requested disconnect completed
    /// or the connection ended without auto-reconnect semantics.
    /// Discovered handles have been released.
    Disconnected {
        /// Transport status code, surfaced verbatim.
        reason: u8,
    },

    /// The link dropped unexpectedly. The transport is attempting to
    /// reconnect; discovered handles and fetched records are preserved,
    /// and discovery re-runs once the link returns.
    LinkLoss,

    /// Battery level read during initialization, in percent.
    BatteryLevel(u8),

    /// Value notifications added records to the store.
    RecordsStored {
        /// How many records arrived.
        count: usize,
    },

    /// A record fetch reached its terminal outcome.
    FetchFinished(FetchOutcome),

    /// A failure was reported. Each failure is surfaced once.
    Error(SessionError),
}
