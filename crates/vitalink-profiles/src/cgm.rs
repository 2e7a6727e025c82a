//! Continuous glucose monitoring profile.
//!
//! CGM sensors sample continuously and report measurements keyed by the
//! time offset (in minutes) from the session start. A single value
//! notification may carry several size-prefixed records, typically when
//! draining backlog through the record access control point.
//!
//! ## Measurement layout (per record)
//!
//! | Field             | Size | Present when         |
//! |-------------------|------|----------------------|
//! | size              | 1    | always (self-incl.)  |
//! | flags             | 1    | always               |
//! | concentration     | 2    | always (SFLOAT)      |
//! | time offset       | 2    | always               |
//! | warning octet     | 1    | flags bit 5          |
//! | cal/temp octet    | 1    | flags bit 6          |
//! | status octet      | 1    | flags bit 7          |
//! | trend             | 2    | flags bit 0 (SFLOAT) |
//! | quality           | 2    | flags bit 1 (SFLOAT) |
//!
//! Bytes past the flagged fields (an E2E-CRC on peripherals that use
//! one) are tolerated and skipped.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vitalink_codec::{flag_set, ByteReader, CodecError, DateTime};
use vitalink_gatt::{uuids, AttributeTable, Operation};
use vitalink_racp::RecordStore;

use crate::profile::{Profile, ProfileValue};

// ============================================================================
// Measurement Flags
// ============================================================================

/// Trend information field present.
const FLAG_TREND_PRESENT: u8 = 0x01;
/// Quality field present.
const FLAG_QUALITY_PRESENT: u8 = 0x02;
/// Sensor status annunciation, warning octet present.
const FLAG_WARNING_OCTET_PRESENT: u8 = 0x20;
/// Sensor status annunciation, calibration/temperature octet present.
const FLAG_CAL_TEMP_OCTET_PRESENT: u8 = 0x40;
/// Sensor status annunciation, status octet present.
const FLAG_STATUS_OCTET_PRESENT: u8 = 0x80;

/// Smallest valid record: size + flags + concentration + time offset.
const MIN_RECORD_SIZE: usize = 6;

/// One continuous glucose measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CgmRecord {
    /// Minutes since session start; the record key.
    pub time_offset_minutes: u16,
    /// Glucose concentration in mg/dL.
    pub concentration_mg_dl: f32,
    /// Sensor warning annunciation octet.
    pub warning_status: Option<u8>,
    /// Sensor calibration/temperature annunciation octet.
    pub cal_temp_status: Option<u8>,
    /// Sensor status annunciation octet.
    pub sensor_status: Option<u8>,
    /// Rate of change in mg/dL/min.
    pub trend_mg_dl_min: Option<f32>,
    /// Measurement quality in percent.
    pub quality_percent: Option<f32>,
}

impl CgmRecord {
    /// Decode every record in a notification payload.
    pub fn decode_all(payload: &[u8]) -> Result<Vec<CgmRecord>, CodecError> {
        let mut reader = ByteReader::new(payload);
        let mut records = Vec::new();
        while !reader.is_empty() {
            records.push(Self::decode_one(&mut reader)?);
        }
        Ok(records)
    }

    fn decode_one(reader: &mut ByteReader<'_>) -> Result<CgmRecord, CodecError> {
        let size = usize::from(reader.u8()?);
        if size < MIN_RECORD_SIZE {
            return Err(CodecError::out_of_range("record size", size as u32));
        }
        // The size field counts itself; everything else is the body.
        let body = reader.take(size - 1)?;
        let mut body = ByteReader::new(body);

        let flags = body.u8()?;
        let concentration_mg_dl = body.sfloat()?;
        let time_offset_minutes = body.u16_le()?;

        let warning_status = if flag_set(flags, FLAG_WARNING_OCTET_PRESENT) {
            Some(body.u8()?)
        } else {
            None
        };
        let cal_temp_status = if flag_set(flags, FLAG_CAL_TEMP_OCTET_PRESENT) {
            Some(body.u8()?)
        } else {
            None
        };
        let sensor_status = if flag_set(flags, FLAG_STATUS_OCTET_PRESENT) {
            Some(body.u8()?)
        } else {
            None
        };

        let trend_mg_dl_min = if flag_set(flags, FLAG_TREND_PRESENT) {
            Some(body.sfloat()?)
        } else {
            None
        };
        let quality_percent = if flag_set(flags, FLAG_QUALITY_PRESENT) {
            Some(body.sfloat()?)
        } else {
            None
        };

        // Whatever remains (E2E-CRC, future fields) is skipped.

        Ok(CgmRecord {
            time_offset_minutes,
            concentration_mg_dl,
            warning_status,
            cal_temp_status,
            sensor_status,
            trend_mg_dl_min,
            quality_percent,
        })
    }
}

/// The CGM feature bitmask (24 bits on the wire). Reserved bits are
/// carried as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgmFeatures(pub u32);

impl CgmFeatures {
    /// Calibration supported.
    pub fn calibration(&self) -> bool {
        self.0 & 0x00_0001 != 0
    }

    /// Patient high/low alerts supported.
    pub fn patient_high_low_alerts(&self) -> bool {
        self.0 & 0x00_0002 != 0
    }

    /// Hypo alerts supported.
    pub fn hypo_alerts(&self) -> bool {
        self.0 & 0x00_0004 != 0
    }

    /// Hyper alerts supported.
    pub fn hyper_alerts(&self) -> bool {
        self.0 & 0x00_0008 != 0
    }

    /// Sensor malfunction detection supported.
    pub fn sensor_malfunction_detection(&self) -> bool {
        self.0 & 0x00_0040 != 0
    }

    /// Trend information supported.
    pub fn trend_information(&self) -> bool {
        self.0 & 0x00_8000 != 0
    }

    /// Quality reporting supported.
    pub fn quality(&self) -> bool {
        self.0 & 0x01_0000 != 0
    }
}

// ============================================================================
// Profile
// ============================================================================

static MANDATORY: [Uuid; 2] = [uuids::CGM_MEASUREMENT, uuids::RECORD_ACCESS_CONTROL_POINT];
static OPTIONAL: [Uuid; 4] = [
    uuids::CGM_FEATURE,
    uuids::CGM_STATUS,
    uuids::CGM_SESSION_START_TIME,
    uuids::CGM_SESSION_RUN_TIME,
];

/// Profile implementation for continuous glucose monitors.
#[derive(Debug, Default)]
pub struct CgmProfile {
    features: Option<CgmFeatures>,
    session_start: Option<DateTime>,
}

impl CgmProfile {
    /// Create the profile.
    pub fn new() -> Self {
        CgmProfile::default()
    }

    /// Feature bitmask read during initialization, when exposed.
    pub fn features(&self) -> Option<CgmFeatures> {
        self.features
    }

    /// Session start time read during initialization, when exposed.
    /// Record time offsets count minutes from this moment.
    pub fn session_start(&self) -> Option<DateTime> {
        self.session_start
    }
}

impl Profile for CgmProfile {
    type Record = CgmRecord;

    fn name(&self) -> &'static str {
        "cgm"
    }

    fn mandatory_attributes(&self) -> &[Uuid] {
        &MANDATORY
    }

    fn optional_attributes(&self) -> &[Uuid] {
        &OPTIONAL
    }

    fn record_attribute(&self) -> Uuid {
        uuids::CGM_MEASUREMENT
    }

    fn init_operations(&self, attributes: &AttributeTable) -> Vec<Operation> {
        let mut operations = Vec::new();

        if let Some(feature) = attributes.find(&uuids::CGM_FEATURE) {
            if feature.properties.can_read() {
                operations.push(Operation::Read(feature.clone()));
            }
        }
        if let Some(start) = attributes.find(&uuids::CGM_SESSION_START_TIME) {
            if start.properties.can_read() {
                operations.push(Operation::Read(start.clone()));
            }
        }
        if let Some(measurement) = attributes.find(&uuids::CGM_MEASUREMENT) {
            operations.push(Operation::EnableNotify(measurement.clone()));
        }
        if let Some(racp) = attributes.find(&uuids::RECORD_ACCESS_CONTROL_POINT) {
            operations.push(Operation::EnableIndicate(racp.clone()));
        }

        operations
    }

    fn handle_value(
        &mut self,
        attribute: &Uuid,
        payload: &[u8],
        store: &mut RecordStore<CgmRecord>,
    ) -> Result<ProfileValue, CodecError> {
        if *attribute != uuids::CGM_MEASUREMENT {
            return Ok(ProfileValue::Ignored);
        }

        let records = CgmRecord::decode_all(payload)?;
        if records.is_empty() {
            warn!("cgm: empty measurement notification");
            return Ok(ProfileValue::Ignored);
        }

        let count = records.len();
        for record in records {
            debug!(
                "cgm: measurement at +{} min: {} mg/dL",
                record.time_offset_minutes, record.concentration_mg_dl
            );
            store.insert(record.time_offset_minutes, record);
        }
        Ok(ProfileValue::Stored { count })
    }

    fn handle_read(&mut self, attribute: &Uuid, value: &[u8]) -> Result<(), CodecError> {
        if *attribute == uuids::CGM_FEATURE {
            let mut reader = ByteReader::new(value);
            let low = u32::from(reader.u16_le()?);
            let high = u32::from(reader.u8()?);
            self.features = Some(CgmFeatures(high << 16 | low));
        } else if *attribute == uuids::CGM_SESSION_START_TIME {
            let mut reader = ByteReader::new(value);
            // Time zone and DST offset octets follow; only the calendar
            // part matters here.
            self.session_start = Some(reader.date_time()?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 105 mg/dL as SFLOAT: mantissa 105, exponent 0.
    const CONC_105: [u8; 2] = [0x69, 0x00];

    fn minimal_record(time_offset: u16) -> Vec<u8> {
        let mut payload = vec![6, 0x00];
        payload.extend_from_slice(&CONC_105);
        payload.extend_from_slice(&time_offset.to_le_bytes());
        payload
    }

    #[test]
    fn test_decode_minimal_record() {
        let records = CgmRecord::decode_all(&minimal_record(15)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].time_offset_minutes, 15);
        assert_eq!(records[0].concentration_mg_dl, 105.0);
        assert!(records[0].trend_mg_dl_min.is_none());
        assert!(records[0].sensor_status.is_none());
    }

    #[test]
    fn test_decode_record_with_trend_and_status() {
        // size 10: flags, conc, offset, warning, status, trend
        let mut payload = vec![10, 0x01 | 0x20 | 0x80];
        payload.extend_from_slice(&CONC_105);
        payload.extend_from_slice(&30u16.to_le_bytes());
        payload.push(0x04); // warning octet
        payload.push(0x01); // status octet
        payload.extend_from_slice(&[0x02, 0xF0]); // trend: 2 * 10^-1
        let records = CgmRecord::decode_all(&payload).unwrap();

        let record = records[0];
        assert_eq!(record.warning_status, Some(0x04));
        assert_eq!(record.sensor_status, Some(0x01));
        assert_eq!(record.cal_temp_status, None);
        assert!((record.trend_mg_dl_min.unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_decode_multiple_records_per_notification() {
        let mut payload = minimal_record(10);
        payload.extend_from_slice(&minimal_record(11));
        payload.extend_from_slice(&minimal_record(12));

        let records = CgmRecord::decode_all(&payload).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].time_offset_minutes, 12);
    }

    #[test]
    fn test_trailing_crc_is_skipped() {
        // size 8 covers flags + conc + offset + 2 unknown trailing bytes
        let mut payload = vec![8, 0x00];
        payload.extend_from_slice(&CONC_105);
        payload.extend_from_slice(&45u16.to_le_bytes());
        payload.extend_from_slice(&[0xAA, 0xBB]);

        let records = CgmRecord::decode_all(&payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].time_offset_minutes, 45);
    }

    #[test]
    fn test_undersized_record_is_an_error() {
        assert!(CgmRecord::decode_all(&[3, 0x00, 0x69]).is_err());
    }

    #[test]
    fn test_truncated_record_is_an_error() {
        // Claims 10 bytes but the buffer ends early.
        let payload = vec![10, 0x00, 0x69, 0x00, 15, 0];
        assert!(CgmRecord::decode_all(&payload).is_err());
    }

    #[test]
    fn test_records_are_stored_by_time_offset() {
        let mut profile = CgmProfile::new();
        let mut store = RecordStore::new();

        let mut payload = minimal_record(20);
        payload.extend_from_slice(&minimal_record(21));

        let value = profile
            .handle_value(&uuids::CGM_MEASUREMENT, &payload, &mut store)
            .unwrap();

        assert_eq!(value, ProfileValue::Stored { count: 2 });
        assert_eq!(store.highest_sequence(), Some(21));
    }

    #[test]
    fn test_feature_read() {
        let mut profile = CgmProfile::new();
        // bits 0 (calibration) and 16 (quality)
        profile
            .handle_read(&uuids::CGM_FEATURE, &[0x01, 0x00, 0x01, 0x00, 0x00, 0x00])
            .unwrap();
        let features = profile.features().unwrap();
        assert!(features.calibration());
        assert!(features.quality());
        assert!(!features.hypo_alerts());
    }

    #[test]
    fn test_session_start_time_read() {
        let mut profile = CgmProfile::new();
        // 2024-03-01 12:00:00, UTC+1, no DST
        let mut value = vec![0xE8, 0x07, 3, 1, 12, 0, 0];
        value.push(4); // time zone, quarter hours
        value.push(0); // DST offset
        profile
            .handle_read(&uuids::CGM_SESSION_START_TIME, &value)
            .unwrap();
        assert_eq!(profile.session_start().unwrap().hour, 12);
    }
}
