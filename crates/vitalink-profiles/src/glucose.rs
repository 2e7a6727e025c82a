//! Glucose meter profile.
//!
//! Spot glucose meters notify one measurement record per value
//! notification, optionally followed by a context record carrying meal,
//! exercise, and medication detail for the same sequence number.
//!
//! ## Measurement layout
//!
//! | Field                | Size | Present when          |
//! |----------------------|------|-----------------------|
//! | flags                | 1    | always                |
//! | sequence number      | 2    | always                |
//! | base time            | 7    | always                |
//! | time offset          | 2    | flags bit 0           |
//! | concentration        | 2    | flags bit 1 (SFLOAT)  |
//! | type/sample location | 1    | flags bit 1 (nibbles) |
//! | sensor status        | 2    | flags bit 3           |

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vitalink_codec::{flag_set, high_nibble, low_nibble, ByteReader, CodecError, DateTime};
use vitalink_gatt::{uuids, AttributeTable, Operation};
use vitalink_racp::RecordStore;

use crate::profile::{Profile, ProfileValue};

// ============================================================================
// Measurement Flags
// ============================================================================

/// Time offset field present.
const FLAG_TIME_OFFSET_PRESENT: u8 = 0x01;
/// Concentration and type/sample location fields present.
const FLAG_CONCENTRATION_PRESENT: u8 = 0x02;
/// Concentration is in mol/L rather than kg/L.
const FLAG_UNIT_MOL_PER_LITRE: u8 = 0x04;
/// Sensor status annunciation field present.
const FLAG_STATUS_PRESENT: u8 = 0x08;
/// A context record for this sequence number follows.
const FLAG_CONTEXT_FOLLOWS: u8 = 0x10;

// ============================================================================
// Context Flags
// ============================================================================

/// Carbohydrate ID and amount present.
const CTX_FLAG_CARBOHYDRATE_PRESENT: u8 = 0x01;
/// Meal field present.
const CTX_FLAG_MEAL_PRESENT: u8 = 0x02;
/// Tester/health nibbles present.
const CTX_FLAG_TESTER_HEALTH_PRESENT: u8 = 0x04;
/// Exercise duration and intensity present.
const CTX_FLAG_EXERCISE_PRESENT: u8 = 0x08;
/// Medication ID and amount present.
const CTX_FLAG_MEDICATION_PRESENT: u8 = 0x10;
/// Medication amount is in litres rather than kilograms.
const CTX_FLAG_MEDICATION_LITRES: u8 = 0x20;
/// HbA1c field present.
const CTX_FLAG_HBA1C_PRESENT: u8 = 0x40;
/// Extended flags octet present.
const CTX_FLAG_EXTENDED: u8 = 0x80;

/// Unit of a glucose concentration sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcentrationUnit {
    /// Mass concentration, kg/L.
    KilogramPerLitre,
    /// Molar concentration, mol/L.
    MolPerLitre,
}

/// Unit of a medication amount in a context record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MedicationUnit {
    /// Mass, kilograms.
    Kilograms,
    /// Volume, litres.
    Litres,
}

/// The concentration portion of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseSample {
    /// Concentration value in `unit`.
    pub value: f32,
    /// Concentration unit.
    pub unit: ConcentrationUnit,
    /// Fluid type (capillary whole blood, plasma, ...), low nibble of
    /// the type/sample-location byte.
    pub sample_type: u8,
    /// Sample location (finger, earlobe, ...), high nibble.
    pub location: u8,
}

/// One stored glucose measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseRecord {
    /// Peripheral-assigned sequence number.
    pub sequence: u16,
    /// Timestamp from the peripheral's clock.
    pub base_time: DateTime,
    /// User-facing time adjustment in minutes, when the peripheral
    /// tracks one.
    pub time_offset_minutes: Option<i16>,
    /// Concentration sample, absent for device-event-only records.
    pub sample: Option<GlucoseSample>,
    /// Sensor status annunciation bits, as transmitted.
    pub sensor_status: Option<u16>,
    /// Whether the peripheral announced a context record for this
    /// sequence number.
    pub context_follows: bool,
    /// Context record merged in when the peripheral sent one.
    pub context: Option<GlucoseContext>,
}

impl GlucoseRecord {
    /// Decode a measurement notification payload.
    ///
    /// Reserved flag bits are ignored; trailing bytes beyond the flagged
    /// fields are tolerated for forward compatibility.
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(payload);
        let flags = reader.u8()?;
        let sequence = reader.u16_le()?;
        let base_time = reader.date_time()?;

        let time_offset_minutes = if flag_set(flags, FLAG_TIME_OFFSET_PRESENT) {
            Some(reader.i16_le()?)
        } else {
            None
        };

        let sample = if flag_set(flags, FLAG_CONCENTRATION_PRESENT) {
            let value = reader.sfloat()?;
            let type_location = reader.u8()?;
            let unit = if flag_set(flags, FLAG_UNIT_MOL_PER_LITRE) {
                ConcentrationUnit::MolPerLitre
            } else {
                ConcentrationUnit::KilogramPerLitre
            };
            Some(GlucoseSample {
                value,
                unit,
                sample_type: low_nibble(type_location),
                location: high_nibble(type_location),
            })
        } else {
            None
        };

        let sensor_status = if flag_set(flags, FLAG_STATUS_PRESENT) {
            Some(reader.u16_le()?)
        } else {
            None
        };

        Ok(GlucoseRecord {
            sequence,
            base_time,
            time_offset_minutes,
            sample,
            sensor_status,
            context_follows: flag_set(flags, FLAG_CONTEXT_FOLLOWS),
            context: None,
        })
    }
}

/// Context detail attached to a measurement: what was eaten, done, or
/// taken around the sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseContext {
    /// Sequence number of the measurement this context belongs to.
    pub sequence: u16,
    /// Carbohydrate identifier (breakfast, lunch, ...).
    pub carbohydrate_id: Option<u8>,
    /// Carbohydrate amount in kilograms.
    pub carbohydrate_kg: Option<f32>,
    /// Meal timing relative to the sample.
    pub meal: Option<u8>,
    /// Who performed the test, low nibble of the tester/health byte.
    pub tester: Option<u8>,
    /// Health state during the test, high nibble.
    pub health: Option<u8>,
    /// Exercise duration in seconds.
    pub exercise_duration_seconds: Option<u16>,
    /// Exercise intensity in percent.
    pub exercise_intensity_percent: Option<u8>,
    /// Medication identifier.
    pub medication_id: Option<u8>,
    /// Medication amount, in `medication_unit`.
    pub medication_amount: Option<f32>,
    /// Unit of the medication amount.
    pub medication_unit: Option<MedicationUnit>,
    /// Glycated hemoglobin in percent.
    pub hba1c_percent: Option<f32>,
}

impl GlucoseContext {
    /// Decode a context notification payload.
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(payload);
        let flags = reader.u8()?;
        let sequence = reader.u16_le()?;

        if flag_set(flags, CTX_FLAG_EXTENDED) {
            // Extended flags are all reserved; skip the octet.
            reader.u8()?;
        }

        let (carbohydrate_id, carbohydrate_kg) = if flag_set(flags, CTX_FLAG_CARBOHYDRATE_PRESENT)
        {
            (Some(reader.u8()?), Some(reader.sfloat()?))
        } else {
            (None, None)
        };

        let meal = if flag_set(flags, CTX_FLAG_MEAL_PRESENT) {
            Some(reader.u8()?)
        } else {
            None
        };

        let (tester, health) = if flag_set(flags, CTX_FLAG_TESTER_HEALTH_PRESENT) {
            let packed = reader.u8()?;
            (Some(low_nibble(packed)), Some(high_nibble(packed)))
        } else {
            (None, None)
        };

        let (exercise_duration_seconds, exercise_intensity_percent) =
            if flag_set(flags, CTX_FLAG_EXERCISE_PRESENT) {
                (Some(reader.u16_le()?), Some(reader.u8()?))
            } else {
                (None, None)
            };

        let (medication_id, medication_amount, medication_unit) =
            if flag_set(flags, CTX_FLAG_MEDICATION_PRESENT) {
                let unit = if flag_set(flags, CTX_FLAG_MEDICATION_LITRES) {
                    MedicationUnit::Litres
                } else {
                    MedicationUnit::Kilograms
                };
                (Some(reader.u8()?), Some(reader.sfloat()?), Some(unit))
            } else {
                (None, None, None)
            };

        let hba1c_percent = if flag_set(flags, CTX_FLAG_HBA1C_PRESENT) {
            Some(reader.sfloat()?)
        } else {
            None
        };

        Ok(GlucoseContext {
            sequence,
            carbohydrate_id,
            carbohydrate_kg,
            meal,
            tester,
            health,
            exercise_duration_seconds,
            exercise_intensity_percent,
            medication_id,
            medication_amount,
            medication_unit,
            hba1c_percent,
        })
    }
}

/// The glucose feature bitmask, read during initialization where the
/// peripheral exposes it. Reserved bits are carried as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlucoseFeatures(pub u16);

impl GlucoseFeatures {
    /// Low battery detection supported.
    pub fn low_battery_detection(&self) -> bool {
        self.0 & 0x0001 != 0
    }

    /// Sensor malfunction detection supported.
    pub fn sensor_malfunction_detection(&self) -> bool {
        self.0 & 0x0002 != 0
    }

    /// Strip insertion error detection supported.
    pub fn strip_insertion_error_detection(&self) -> bool {
        self.0 & 0x0008 != 0
    }

    /// Sensor result high-low detection supported.
    pub fn result_high_low_detection(&self) -> bool {
        self.0 & 0x0020 != 0
    }

    /// General device fault detection supported.
    pub fn general_fault_detection(&self) -> bool {
        self.0 & 0x0100 != 0
    }

    /// Multiple bonds supported.
    pub fn multiple_bonds(&self) -> bool {
        self.0 & 0x0400 != 0
    }
}

// ============================================================================
// Profile
// ============================================================================

static MANDATORY: [Uuid; 2] = [uuids::GLUCOSE_MEASUREMENT, uuids::RECORD_ACCESS_CONTROL_POINT];
static OPTIONAL: [Uuid; 2] = [uuids::GLUCOSE_MEASUREMENT_CONTEXT, uuids::GLUCOSE_FEATURE];

/// Profile implementation for spot glucose meters.
#[derive(Debug, Default)]
pub struct GlucoseProfile {
    features: Option<GlucoseFeatures>,
}

impl GlucoseProfile {
    /// Create the profile.
    pub fn new() -> Self {
        GlucoseProfile::default()
    }

    /// Feature bitmask read during initialization, when the peripheral
    /// exposes one.
    pub fn features(&self) -> Option<GlucoseFeatures> {
        self.features
    }
}

impl Profile for GlucoseProfile {
    type Record = GlucoseRecord;

    fn name(&self) -> &'static str {
        "glucose"
    }

    fn mandatory_attributes(&self) -> &[Uuid] {
        &MANDATORY
    }

    fn optional_attributes(&self) -> &[Uuid] {
        &OPTIONAL
    }

    fn record_attribute(&self) -> Uuid {
        uuids::GLUCOSE_MEASUREMENT
    }

    fn init_operations(&self, attributes: &AttributeTable) -> Vec<Operation> {
        let mut operations = Vec::new();

        if let Some(feature) = attributes.find(&uuids::GLUCOSE_FEATURE) {
            if feature.properties.can_read() {
                operations.push(Operation::Read(feature.clone()));
            }
        }
        if let Some(measurement) = attributes.find(&uuids::GLUCOSE_MEASUREMENT) {
            operations.push(Operation::EnableNotify(measurement.clone()));
        }
        if let Some(context) = attributes.find(&uuids::GLUCOSE_MEASUREMENT_CONTEXT) {
            operations.push(Operation::EnableNotify(context.clone()));
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
        store: &mut RecordStore<GlucoseRecord>,
    ) -> Result<ProfileValue, CodecError> {
        if *attribute == uuids::GLUCOSE_MEASUREMENT {
            let record = GlucoseRecord::decode(payload)?;
            debug!(
                "glucose: measurement #{} at {}",
                record.sequence, record.base_time
            );
            store.insert(record.sequence, record);
            return Ok(ProfileValue::Stored { count: 1 });
        }

        if *attribute == uuids::GLUCOSE_MEASUREMENT_CONTEXT {
            let context = GlucoseContext::decode(payload)?;
            let sequence = context.sequence;
            return match store.get_mut(sequence) {
                Some(record) => {
                    record.context = Some(context);
                    Ok(ProfileValue::Merged { sequence })
                }
                None => {
                    warn!("glucose: context for unknown measurement #{sequence}");
                    Ok(ProfileValue::Ignored)
                }
            };
        }

        Ok(ProfileValue::Ignored)
    }

    fn handle_read(&mut self, attribute: &Uuid, value: &[u8]) -> Result<(), CodecError> {
        if *attribute == uuids::GLUCOSE_FEATURE {
            let mut reader = ByteReader::new(value);
            self.features = Some(GlucoseFeatures(reader.u16_le()?));
        }
        Ok(())
    }
}
