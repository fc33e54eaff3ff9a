use super::{u32_at, Payload};
use crate::telemetry::{Field, Reading, Value};

/// What the pack is currently doing, as reported in the MOSFET response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Stationary,
    Charging,
    Discharging,
}

impl ChargeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeState::Stationary => "Stationary",
            ChargeState::Charging => "Charging",
            ChargeState::Discharging => "Discharging",
        }
    }
}

/// Response to 0x93: charge state, MOSFET switches and remaining capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosfetMessage(Payload);

impl MosfetMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    /// `None` for codes the BMS documentation does not define.
    pub fn charge_state(&self) -> Option<ChargeState> {
        match self.0[0] {
            0 => Some(ChargeState::Stationary),
            1 => Some(ChargeState::Charging),
            2 => Some(ChargeState::Discharging),
            _ => None,
        }
    }

    pub fn charging_mos_enabled(&self) -> bool {
        self.0[1] != 0
    }

    pub fn discharging_mos_enabled(&self) -> bool {
        self.0[2] != 0
    }

    /// BMS life counter, 0-255
    pub fn bms_life(&self) -> u8 {
        self.0[3]
    }

    /// Remaining capacity in Ah
    pub fn remaining_capacity(&self) -> f32 {
        u32_at(&self.0, 4) as f32 / 1000.0
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        let mut readings = Vec::with_capacity(5);
        if let Some(state) = self.charge_state() {
            readings.push(Reading::Field(Field::Status, Value::Text(state.as_str())));
        }
        readings.push(Reading::flag(Field::ChargingMosEnabled, self.charging_mos_enabled()));
        readings.push(Reading::flag(Field::DischargingMosEnabled, self.discharging_mos_enabled()));
        readings.push(Reading::number(Field::BmsLife, self.bms_life() as f32));
        readings.push(Reading::number(Field::RemainingCapacity, self.remaining_capacity()));
        readings
    }
}

#[test]
fn test_mosfet_charging() {
    // 0x00015f90 = 90000 mAh
    let message = MosfetMessage::new([0x01, 0x01, 0x00, 0x2a, 0x00, 0x01, 0x5f, 0x90]);
    assert_eq!(message.charge_state(), Some(ChargeState::Charging));
    assert!(message.charging_mos_enabled());
    assert!(!message.discharging_mos_enabled());
    assert_eq!(message.bms_life(), 42);
    assert_eq!(message.remaining_capacity(), 90.0);
    assert_eq!(
        message.readings()[0],
        Reading::Field(Field::Status, Value::Text("Charging"))
    );
}

#[test]
fn test_mosfet_unknown_state_skips_status() {
    let message = MosfetMessage::new([0x07, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(message.charge_state(), None);
    assert!(message
        .readings()
        .iter()
        .all(|r| !matches!(r, Reading::Field(Field::Status, _))));
}
