//! Attribute identities, properties, and the discovered attribute table.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Characteristic Properties
// ============================================================================

/// Attribute supports broadcast.
pub const PROP_BROADCAST: u8 = 0x01;
/// Attribute supports read.
pub const PROP_READ: u8 = 0x02;
/// Attribute supports write without response.
pub const PROP_WRITE_WITHOUT_RESPONSE: u8 = 0x04;
/// Attribute supports write.
pub const PROP_WRITE: u8 = 0x08;
/// Attribute supports notifications.
pub const PROP_NOTIFY: u8 = 0x10;
/// Attribute supports indications.
pub const PROP_INDICATE: u8 = 0x20;

/// The properties byte discovered alongside an attribute.
///
/// Reserved bits are carried as-is; consumers test only the bits they
/// understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacteristicProperties(pub u8);

impl CharacteristicProperties {
    /// Create from a raw properties byte.
    pub fn new(raw: u8) -> Self {
        CharacteristicProperties(raw)
    }

    /// Whether the attribute can be read.
    pub fn can_read(&self) -> bool {
        self.0 & PROP_READ != 0
    }

    /// Whether the attribute can be written with response.
    pub fn can_write(&self) -> bool {
        self.0 & PROP_WRITE != 0
    }

    /// Whether the attribute can be written without response.
    pub fn can_write_without_response(&self) -> bool {
        self.0 & PROP_WRITE_WITHOUT_RESPONSE != 0
    }

    /// Whether the attribute supports notifications.
    pub fn can_notify(&self) -> bool {
        self.0 & PROP_NOTIFY != 0
    }

    /// Whether the attribute supports indications.
    pub fn can_indicate(&self) -> bool {
        self.0 & PROP_INDICATE != 0
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// A typed, addressable value exposed by the peripheral.
///
/// Identified by its characteristic UUID; the handle is the peripheral's
/// address for it on this connection and is only meaningful to the
/// transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// Attribute handle assigned by the peripheral.
    pub handle: u16,
    /// Discovered properties.
    pub properties: CharacteristicProperties,
}

impl Attribute {
    /// Create a new attribute description.
    pub fn new(uuid: Uuid, handle: u16, properties: CharacteristicProperties) -> Self {
        Attribute {
            uuid,
            handle,
            properties,
        }
    }
}

/// The set of attributes found by service discovery.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    attributes: Vec<Attribute>,
}

impl AttributeTable {
    /// Create an empty table.
    pub fn new() -> Self {
        AttributeTable::default()
    }

    /// Build a table from discovered attributes.
    pub fn from_attributes(attributes: Vec<Attribute>) -> Self {
        AttributeTable { attributes }
    }

    /// Look up an attribute by characteristic UUID.
    pub fn find(&self, uuid: &Uuid) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.uuid == *uuid)
    }

    /// Whether an attribute with the given UUID was discovered.
    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.find(uuid).is_some()
    }

    /// Number of discovered attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate over the discovered attributes.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }
}
