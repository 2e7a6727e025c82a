//! Connection and bond state enums.

/// Lifecycle of one peripheral connection, owned by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link, no pending request.
    Disconnected,
    /// Connect requested, waiting for the link.
    Connecting,
    /// Link up, waiting out the settle delay before discovery.
    Connected,
    /// Attribute discovery in flight.
    Discovering,
    /// Link up but pairing is in progress; discovery is deferred until the
    /// bond completes.
    Bonding,
    /// Discovery done, draining the initialization queue.
    Initializing,
    /// Initialization complete; record traffic may flow.
    Ready,
    /// Disconnect requested, waiting for the link to drop.
    Disconnecting,
    /// Link dropped unexpectedly; the transport is attempting to
    /// reconnect and discovered handles are preserved.
    LinkLoss,
}

/// Pairing state reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondState {
    /// No bond with this peripheral.
    NotBonded,
    /// Pairing/key exchange in progress.
    Bonding,
    /// A persistent bond exists.
    Bonded,
}
