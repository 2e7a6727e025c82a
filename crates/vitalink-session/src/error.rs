//! Session error taxonomy.

use thiserror::Error;
use uuid::Uuid;

use vitalink_gatt::TransportError;
use vitalink_racp::RacpError;

/// Errors surfaced by the session. Each is reported once; nothing
/// retries automatically; the caller decides whether to retry the whole
/// session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `connect` was called while a connection exists or is being
    /// opened.
    #[error("a connection is already open or being opened")]
    AlreadyConnected,

    /// A record operation was requested before initialization finished.
    #[error("the session is not ready")]
    NotReady,

    /// The transport could not establish the link.
    #[error("connection failed: transport status {0}")]
    ConnectionError(u8),

    /// Attribute discovery failed.
    #[error("attribute discovery failed: transport status {0}")]
    DiscoveryError(u8),

    /// A mandatory attribute of the active profile is absent; the
    /// session disconnects automatically.
    #[error("peripheral is missing mandatory attribute {missing}")]
    DeviceNotSupported {
        /// The first missing mandatory attribute.
        missing: Uuid,
    },

    /// A bonded link reported insufficient authentication. The stored
    /// bond is stale; re-pairing is required, retrying is not.
    #[error("bonded link rejected authentication; re-pairing is required")]
    AuthenticationRequired,

    /// An initialization read/write/descriptor-write failed.
    #[error("initialization step on {attribute} failed: transport status {status}")]
    OperationFailed {
        /// Attribute the failed operation targeted.
        attribute: Uuid,
        /// Transport status code.
        status: u8,
    },

    /// A record access protocol failure.
    #[error(transparent)]
    Racp(#[from] RacpError),

    /// A request could not be issued to the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
