use std::collections::BTreeMap;
use std::fmt;

use crate::telemetry::{Field, TelemetrySink, Value, FAULT_FRAME_SIZE};

/// The latest reported state of the battery.
///
/// Keeps the most recent value of every field it has been sent, plus the
/// raw codes of the last failure status frame.
#[derive(Debug, Default, Clone)]
pub struct BatteryState {
    values: BTreeMap<Field, Value>,
    fault_codes: Option<[u8; FAULT_FRAME_SIZE]>,
}

impl BatteryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<Value> {
        self.values.get(&field).copied()
    }

    /// The value of `field` if it is numeric.
    pub fn number(&self, field: Field) -> Option<f32> {
        match self.get(field) {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        }
    }

    /// The value of `field` if it is a flag.
    pub fn flag(&self, field: Field) -> Option<bool> {
        match self.get(field) {
            Some(Value::Flag(b)) => Some(b),
            _ => None,
        }
    }

    /// `(cell number, voltage in V)` for every cell reported so far, in cell order.
    pub fn cell_voltages(&self) -> Vec<(u8, f32)> {
        self.values
            .iter()
            .filter_map(|(field, value)| match (field, value) {
                (Field::CellVoltage(cell), Value::Number(volts)) => Some((*cell, *volts)),
                _ => None,
            })
            .collect()
    }

    /// Raw codes of the last failure status frame.
    pub fn fault_codes(&self) -> Option<&[u8; FAULT_FRAME_SIZE]> {
        self.fault_codes.as_ref()
    }

    /// Any fault bit set in the last failure status frame.
    pub fn has_faults(&self) -> bool {
        self.fault_codes
            .is_some_and(|codes| codes.iter().any(|byte| *byte != 0))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.fault_codes.is_none()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.fault_codes = None;
    }
}

impl TelemetrySink for BatteryState {
    fn publish(&mut self, field: Field, value: Value) {
        self.values.insert(field, value);
    }

    fn publish_fault_frame(&mut self, codes: &[u8; FAULT_FRAME_SIZE]) {
        self.fault_codes = Some(*codes);
    }
}

impl fmt::Display for BatteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (field, value) in self.iter() {
            match field.unit() {
                Some(unit) => writeln!(f, "{field}: {value} {unit}")?,
                None => writeln!(f, "{field}: {value}")?,
            }
        }
        if let Some(codes) = &self.fault_codes {
            writeln!(f, "fault_codes: {}", hex::encode(codes))?;
        }
        Ok(())
    }
}

#[test]
fn test_battery_state_keeps_latest() {
    let mut state = BatteryState::new();
    state.publish(Field::Voltage, Value::Number(26.0));
    state.publish(Field::Voltage, Value::Number(26.4));
    state.publish(Field::ChargingMosEnabled, Value::Flag(true));

    assert_eq!(state.number(Field::Voltage), Some(26.4));
    assert_eq!(state.flag(Field::ChargingMosEnabled), Some(true));
    assert_eq!(state.number(Field::ChargingMosEnabled), None);
    assert_eq!(state.len(), 2);
}

#[test]
fn test_battery_state_cell_voltages_in_order() {
    let mut state = BatteryState::new();
    state.publish(Field::CellVoltage(10), Value::Number(3.31));
    state.publish(Field::CellVoltage(2), Value::Number(3.32));
    state.publish(Field::Voltage, Value::Number(26.4));
    state.publish(Field::CellVoltage(1), Value::Number(3.33));

    assert_eq!(state.cell_voltages(), vec![(1, 3.33), (2, 3.32), (10, 3.31)]);
}

#[test]
fn test_battery_state_faults() {
    let mut state = BatteryState::new();
    assert!(!state.has_faults());
    state.publish_fault_frame(&[0; FAULT_FRAME_SIZE]);
    assert!(!state.has_faults());
    state.publish_fault_frame(&[0, 0, 0x04, 0, 0, 0, 0]);
    assert!(state.has_faults());
    assert!(state.to_string().contains("fault_codes: 00000400000000"));
}

#[test]
fn test_battery_state_display() {
    let mut state = BatteryState::new();
    state.publish(Field::Voltage, Value::Number(26.5));
    state.publish(Field::Status, Value::Text("Charging"));
    assert_eq!(state.to_string(), "voltage: 26.5 V\nstatus: Charging\n");
}

#[test]
fn test_battery_state_clear() {
    let mut state = BatteryState::new();
    state.publish(Field::Cycles, Value::Number(12.0));
    state.publish_fault_frame(&[0; FAULT_FRAME_SIZE]);
    assert_eq!(state.iter().count(), 1);

    state.clear();
    assert!(state.is_empty());
    assert_eq!(state.iter().count(), 0);
    assert_eq!(state.fault_codes(), None);
}
