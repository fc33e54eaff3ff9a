//! Alarm thresholds and nominal ratings configured on the BMS.

use super::{u16_at, u32_at, Payload};
use crate::telemetry::{Field, Reading};

/// Response to 0x59: cell voltage alarm levels in V.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellThresholdsMessage(Payload);

impl CellThresholdsMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        let mv = |i| u16_at(&self.0, i) as f32 / 1000.0;
        vec![
            Reading::number(Field::CellLevel1AlarmHighVoltage, mv(0)),
            Reading::number(Field::CellLevel2AlarmHighVoltage, mv(2)),
            Reading::number(Field::CellLevel1AlarmLowVoltage, mv(4)),
            Reading::number(Field::CellLevel2AlarmLowVoltage, mv(6)),
        ]
    }
}

/// Response to 0x5A: pack voltage alarm levels in V.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackThresholdsMessage(Payload);

impl PackThresholdsMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        let dv = |i| u16_at(&self.0, i) as f32 / 10.0;
        vec![
            Reading::number(Field::PackLevel1AlarmHighVoltage, dv(0)),
            Reading::number(Field::PackLevel2AlarmHighVoltage, dv(2)),
            Reading::number(Field::PackLevel1AlarmLowVoltage, dv(4)),
            Reading::number(Field::PackLevel2AlarmLowVoltage, dv(6)),
        ]
    }
}

/// Response to 0x5E: alarm levels for the spread between cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestThresholdsMessage(Payload);

impl RestThresholdsMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        let mv = |i| u16_at(&self.0, i) as f32 / 1000.0;
        vec![
            Reading::number(Field::CellLevel1AlarmDifferenceVoltage, mv(0)),
            Reading::number(Field::CellLevel2AlarmDifferenceVoltage, mv(2)),
            // plain degrees, no offset
            Reading::number(Field::CellLevel1AlarmDifferenceTemperature, self.0[4] as f32),
            Reading::number(Field::CellLevel2AlarmDifferenceTemperature, self.0[5] as f32),
        ]
    }
}

/// Response to 0x50: rated capacity and nominal cell voltage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NominalMessage(Payload);

impl NominalMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    /// Rated capacity in Ah
    pub fn nominal_capacity(&self) -> f32 {
        u32_at(&self.0, 0) as f32 / 1000.0
    }

    /// Nominal cell voltage in V
    pub fn nominal_voltage(&self) -> f32 {
        u16_at(&self.0, 6) as f32 / 1000.0
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        vec![
            Reading::number(Field::CellNominalCapacity, self.nominal_capacity()),
            Reading::number(Field::CellNominalVoltage, self.nominal_voltage()),
        ]
    }
}

#[test]
fn test_cell_thresholds() {
    // 3.650 / 3.700 / 2.800 / 2.500 V
    let message = CellThresholdsMessage::new([0x0e, 0x42, 0x0e, 0x74, 0x0a, 0xf0, 0x09, 0xc4]);
    assert_eq!(
        message.readings(),
        vec![
            Reading::number(Field::CellLevel1AlarmHighVoltage, 3.65),
            Reading::number(Field::CellLevel2AlarmHighVoltage, 3.7),
            Reading::number(Field::CellLevel1AlarmLowVoltage, 2.8),
            Reading::number(Field::CellLevel2AlarmLowVoltage, 2.5),
        ]
    );
}

#[test]
fn test_pack_thresholds() {
    // 29.2 / 29.6 / 22.4 / 20.0 V
    let message = PackThresholdsMessage::new([0x01, 0x24, 0x01, 0x28, 0x00, 0xe0, 0x00, 0xc8]);
    let values: Vec<Reading> = message.readings();
    assert_eq!(values[0], Reading::number(Field::PackLevel1AlarmHighVoltage, 29.2));
    assert_eq!(values[3], Reading::number(Field::PackLevel2AlarmLowVoltage, 20.0));
}

#[test]
fn test_rest_thresholds() {
    let message = RestThresholdsMessage::new([0x01, 0xf4, 0x03, 0xe8, 0x05, 0x0a, 0x00, 0x00]);
    assert_eq!(
        message.readings(),
        vec![
            Reading::number(Field::CellLevel1AlarmDifferenceVoltage, 0.5),
            Reading::number(Field::CellLevel2AlarmDifferenceVoltage, 1.0),
            Reading::number(Field::CellLevel1AlarmDifferenceTemperature, 5.0),
            Reading::number(Field::CellLevel2AlarmDifferenceTemperature, 10.0),
        ]
    );
}

#[test]
fn test_nominal() {
    // 100 Ah, 3.2 V
    let message = NominalMessage::new([0x00, 0x01, 0x86, 0xa0, 0x00, 0x00, 0x0c, 0x80]);
    assert_eq!(message.nominal_capacity(), 100.0);
    assert_eq!(message.nominal_voltage(), 3.2);
}
