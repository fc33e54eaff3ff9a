use super::{u16_at, Payload, CURRENT_OFFSET};
use crate::telemetry::{Field, Reading};

/// Response to 0x90: pack voltage, current and state of charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocMessage(Payload);

impl SocMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    /// Pack voltage in V
    pub fn voltage(&self) -> f32 {
        self.voltage_dv() as f32 / 10.0
    }

    /// Pack current in A, negative while discharging
    pub fn current(&self) -> f32 {
        self.current_da() as f32 / 10.0
    }

    /// Pack power in W. Not transmitted, derived from voltage and current.
    pub fn power(&self) -> f32 {
        (self.voltage_dv() as i64 * self.current_da() as i64) as f32 / 100.0
    }

    /// State of charge in %
    pub fn battery_level(&self) -> f32 {
        u16_at(&self.0, 6) as f32 / 10.0
    }

    fn voltage_dv(&self) -> u16 {
        u16_at(&self.0, 0)
    }

    fn current_da(&self) -> i32 {
        u16_at(&self.0, 4) as i32 - CURRENT_OFFSET
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        vec![
            Reading::number(Field::Voltage, self.voltage()),
            Reading::number(Field::Current, self.current()),
            Reading::number(Field::Power, self.power()),
            Reading::number(Field::BatteryLevel, self.battery_level()),
        ]
    }
}

#[test]
fn test_soc_idle_pack() {
    let message = SocMessage::new([0x01, 0x2c, 0x00, 0x00, 0x75, 0x30, 0x00, 0x00]);
    assert_eq!(message.voltage(), 30.0);
    assert_eq!(message.current(), 0.0);
    assert_eq!(message.power(), 0.0);
}

#[test]
fn test_soc_discharging() {
    // 26.5 V, 29950 -> -5.0 A, 87.3 %
    let message = SocMessage::new([0x01, 0x09, 0x00, 0x00, 0x74, 0xfe, 0x03, 0x69]);
    assert_eq!(message.voltage(), 26.5);
    assert_eq!(message.current(), -5.0);
    assert_eq!(message.power(), -132.5);
    assert_eq!(message.battery_level(), 87.3);
}

#[test]
fn test_soc_extreme_raw_values_do_not_overflow() {
    let message = SocMessage::new([0xff; 8]);
    assert_eq!(message.power(), (65535i64 * 35535) as f32 / 100.0);
}
