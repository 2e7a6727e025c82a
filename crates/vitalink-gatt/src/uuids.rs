//! Assigned 16-bit characteristic and service UUIDs used by the stack.

use uuid::Uuid;

/// The Bluetooth base UUID, 0000xxxx-0000-1000-8000-00805F9B34FB, with the
/// 16-bit assigned number slot zeroed.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_00805F9B34FB;

/// Expand a 16-bit assigned number into a full 128-bit UUID.
pub const fn assigned16(short: u16) -> Uuid {
    Uuid::from_u128(BASE_UUID | (short as u128) << 96)
}

// ============================================================================
// Generic Attribute / Battery
// ============================================================================

/// Generic Attribute service.
pub const GENERIC_ATTRIBUTE_SERVICE: Uuid = assigned16(0x1801);
/// Service Changed characteristic (indicate-only).
pub const SERVICE_CHANGED: Uuid = assigned16(0x2A05);
/// Battery service.
pub const BATTERY_SERVICE: Uuid = assigned16(0x180F);
/// Battery Level characteristic (percentage, one byte).
pub const BATTERY_LEVEL: Uuid = assigned16(0x2A19);
/// Client Characteristic Configuration descriptor.
pub const CLIENT_CHARACTERISTIC_CONFIG: Uuid = assigned16(0x2902);

// ============================================================================
// Glucose Profile
// ============================================================================

/// Glucose service.
pub const GLUCOSE_SERVICE: Uuid = assigned16(0x1808);
/// Glucose Measurement characteristic.
pub const GLUCOSE_MEASUREMENT: Uuid = assigned16(0x2A18);
/// Glucose Measurement Context characteristic.
pub const GLUCOSE_MEASUREMENT_CONTEXT: Uuid = assigned16(0x2A34);
/// Glucose Feature characteristic.
pub const GLUCOSE_FEATURE: Uuid = assigned16(0x2A51);
/// Record Access Control Point characteristic, shared by the glucose and
/// CGM profiles.
pub const RECORD_ACCESS_CONTROL_POINT: Uuid = assigned16(0x2A52);

// ============================================================================
// Continuous Glucose Monitoring Profile
// ============================================================================

/// Continuous Glucose Monitoring service.
pub const CGM_SERVICE: Uuid = assigned16(0x181F);
/// CGM Measurement characteristic.
pub const CGM_MEASUREMENT: Uuid = assigned16(0x2AA7);
/// CGM Feature characteristic.
pub const CGM_FEATURE: Uuid = assigned16(0x2AA8);
/// CGM Status characteristic.
pub const CGM_STATUS: Uuid = assigned16(0x2AA9);
/// CGM Session Start Time characteristic.
pub const CGM_SESSION_START_TIME: Uuid = assigned16(0x2AAA);
/// CGM Session Run Time characteristic.
pub const CGM_SESSION_RUN_TIME: Uuid = assigned16(0x2AAB);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned16_expansion() {
        assert_eq!(
            SERVICE_CHANGED.to_string(),
            "00002a05-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            RECORD_ACCESS_CONTROL_POINT.to_string(),
            "00002a52-0000-1000-8000-00805f9b34fb"
        );
    }
}
