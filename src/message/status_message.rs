use super::{u16_at, Payload};
use crate::telemetry::{Field, Reading};

/// Response to 0x94: pack layout and cycle count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage(Payload);

impl StatusMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub fn cells_number(&self) -> u8 {
        self.0[0]
    }

    pub fn temperature_sensors_number(&self) -> u8 {
        self.0[1]
    }

    /// Lifetime number of charge cycles
    pub fn cycles(&self) -> u16 {
        u16_at(&self.0, 5)
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        vec![
            Reading::number(Field::CellsNumber, self.cells_number() as f32),
            Reading::number(Field::TemperatureSensorsNumber, self.temperature_sensors_number() as f32),
            Reading::number(Field::Cycles, self.cycles() as f32),
        ]
    }
}

#[test]
fn test_status() {
    let message = StatusMessage::new([0x08, 0x02, 0x00, 0x00, 0x00, 0x01, 0x2c, 0x00]);
    assert_eq!(message.cells_number(), 8);
    assert_eq!(message.temperature_sensors_number(), 2);
    assert_eq!(message.cycles(), 300);
}
