use super::{celsius, u16_at, Payload};
use crate::telemetry::{Field, Reading};

/// Response to 0x91: highest and lowest cell voltage and which cells they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoltageRangeMessage(Payload);

impl VoltageRangeMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub fn max_cell_voltage(&self) -> f32 {
        self.max_mv() as f32 / 1000.0
    }

    pub fn max_cell_number(&self) -> u8 {
        self.0[2]
    }

    pub fn min_cell_voltage(&self) -> f32 {
        self.min_mv() as f32 / 1000.0
    }

    pub fn min_cell_number(&self) -> u8 {
        self.0[5]
    }

    /// Spread between the highest and lowest cell in V
    pub fn difference(&self) -> f32 {
        (self.max_mv() as i32 - self.min_mv() as i32) as f32 / 1000.0
    }

    fn max_mv(&self) -> u16 {
        u16_at(&self.0, 0)
    }

    fn min_mv(&self) -> u16 {
        u16_at(&self.0, 3)
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        vec![
            Reading::number(Field::MaxCellVoltage, self.max_cell_voltage()),
            Reading::number(Field::MaxCellVoltageNumber, self.max_cell_number() as f32),
            Reading::number(Field::MinCellVoltage, self.min_cell_voltage()),
            Reading::number(Field::MinCellVoltageNumber, self.min_cell_number() as f32),
            Reading::number(Field::CellVoltageDifference, self.difference()),
        ]
    }
}

/// Response to 0x92: highest and lowest probe temperature and which probes they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperatureRangeMessage(Payload);

impl TemperatureRangeMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        vec![
            Reading::number(Field::MaxTemperature, celsius(self.0[0])),
            Reading::number(Field::MaxTemperatureProbeNumber, self.0[1] as f32),
            Reading::number(Field::MinTemperature, celsius(self.0[2])),
            Reading::number(Field::MinTemperatureProbeNumber, self.0[3] as f32),
        ]
    }
}

#[test]
fn test_voltage_range() {
    // 3.350 V on cell 4, 3.322 V on cell 7
    let message = VoltageRangeMessage::new([0x0d, 0x16, 0x04, 0x0c, 0xfa, 0x07, 0x00, 0x00]);
    assert_eq!(message.max_cell_voltage(), 3.35);
    assert_eq!(message.max_cell_number(), 4);
    assert_eq!(message.min_cell_voltage(), 3.322);
    assert_eq!(message.min_cell_number(), 7);
    assert_eq!(message.difference(), 0.028);
}

#[test]
fn test_temperature_range_below_zero() {
    let message = TemperatureRangeMessage::new([0x5a, 0x01, 0x1e, 0x02, 0, 0, 0, 0]);
    assert_eq!(
        message.readings(),
        vec![
            Reading::number(Field::MaxTemperature, 50.0),
            Reading::number(Field::MaxTemperatureProbeNumber, 1.0),
            Reading::number(Field::MinTemperature, -10.0),
            Reading::number(Field::MinTemperatureProbeNumber, 2.0),
        ]
    );
}
