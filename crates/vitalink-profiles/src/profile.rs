//! The profile contract consumed by the session.

use uuid::Uuid;

use vitalink_codec::CodecError;
use vitalink_gatt::{uuids, AttributeTable, Operation};
use vitalink_racp::RecordStore;

/// What a value notification amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileValue {
    /// New records were decoded and inserted into the store.
    Stored {
        /// How many records the notification carried.
        count: usize,
    },
    /// Auxiliary data was merged into an already-stored record.
    Merged {
        /// Sequence number of the record that absorbed it.
        sequence: u16,
    },
    /// The payload targeted no record attribute this profile knows, or a
    /// record that is not present.
    Ignored,
}

/// A sensor profile: the attribute requirements, initialization steps,
/// and payload decoding for one class of peripheral.
///
/// Profiles are stateful where the peripheral gives them state to hold
/// (feature bitmasks, session start times); one profile value lives per
/// session.
pub trait Profile {
    /// Decoded record type this profile produces.
    type Record;

    /// Human-readable profile name, for logging.
    fn name(&self) -> &'static str;

    /// Attributes that must be present for the peripheral to be
    /// supported. A missing one fails initialization.
    fn mandatory_attributes(&self) -> &[Uuid];

    /// Attributes that improve the experience when present but do not
    /// block readiness.
    fn optional_attributes(&self) -> &[Uuid];

    /// The record access control point this profile retrieves records
    /// through. Both shipped profiles use the shared characteristic.
    fn control_point(&self) -> Uuid {
        uuids::RECORD_ACCESS_CONTROL_POINT
    }

    /// The attribute that streams measurement records.
    fn record_attribute(&self) -> Uuid;

    /// Profile-specific initialization operations, in issue order.
    /// Operations must only target attributes present in `attributes`.
    fn init_operations(&self, attributes: &AttributeTable) -> Vec<Operation>;

    /// Decode a value notification and fold it into the store.
    fn handle_value(
        &mut self,
        attribute: &Uuid,
        payload: &[u8],
        store: &mut RecordStore<Self::Record>,
    ) -> Result<ProfileValue, CodecError>;

    /// Absorb the result of a read issued during initialization
    /// (feature bitmasks and the like). The default ignores it.
    fn handle_read(&mut self, attribute: &Uuid, value: &[u8]) -> Result<(), CodecError> {
        let _ = (attribute, value);
        Ok(())
    }
}
