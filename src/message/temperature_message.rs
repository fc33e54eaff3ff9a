use super::{celsius, Payload};
use crate::telemetry::{Field, Reading};

/// Response to 0x96: the first two temperature probes. Byte 0 is the frame
/// number and is not needed for two probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperatureMessage(Payload);

impl TemperatureMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        vec![
            Reading::number(Field::Temperature(1), celsius(self.0[1])),
            Reading::number(Field::Temperature(2), celsius(self.0[2])),
        ]
    }
}

#[test]
fn test_temperatures() {
    let message = TemperatureMessage::new([0x01, 0x5a, 0x3d, 0, 0, 0, 0, 0]);
    assert_eq!(
        message.readings(),
        vec![
            Reading::number(Field::Temperature(1), 50.0),
            Reading::number(Field::Temperature(2), 21.0),
        ]
    );
}
