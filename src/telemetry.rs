//! Named telemetry values and the sink they are published to.

use std::collections::HashSet;
use std::fmt;

/// Number of raw fault code bytes carried by a failure status frame.
pub const FAULT_FRAME_SIZE: usize = 7;

/// Every value the BMS reports. The `Display` form is the stable field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Voltage,
    Current,
    Power,
    BatteryLevel,
    MaxCellVoltage,
    MaxCellVoltageNumber,
    MinCellVoltage,
    MinCellVoltageNumber,
    CellVoltageDifference,
    MaxTemperature,
    MaxTemperatureProbeNumber,
    MinTemperature,
    MinTemperatureProbeNumber,
    Status,
    ChargingMosEnabled,
    DischargingMosEnabled,
    BmsLife,
    RemainingCapacity,
    CellsNumber,
    TemperatureSensorsNumber,
    Cycles,
    /// Voltage of cell n, counting from 1
    CellVoltage(u8),
    /// Temperature probe n, counting from 1
    Temperature(u8),
    /// Whether cell n, counting from 1, is being balanced
    CellBalanceActive(u8),
    CellLevel1AlarmHighVoltage,
    CellLevel2AlarmHighVoltage,
    CellLevel1AlarmLowVoltage,
    CellLevel2AlarmLowVoltage,
    PackLevel1AlarmHighVoltage,
    PackLevel2AlarmHighVoltage,
    PackLevel1AlarmLowVoltage,
    PackLevel2AlarmLowVoltage,
    CellLevel1AlarmDifferenceVoltage,
    CellLevel2AlarmDifferenceVoltage,
    CellLevel1AlarmDifferenceTemperature,
    CellLevel2AlarmDifferenceTemperature,
    CellNominalCapacity,
    CellNominalVoltage,
}

impl Field {
    /// Unit of measurement, if the value has one.
    pub fn unit(&self) -> Option<&'static str> {
        use Field::*;
        match self {
            Voltage
            | MaxCellVoltage
            | MinCellVoltage
            | CellVoltageDifference
            | CellVoltage(_)
            | CellLevel1AlarmHighVoltage
            | CellLevel2AlarmHighVoltage
            | CellLevel1AlarmLowVoltage
            | CellLevel2AlarmLowVoltage
            | PackLevel1AlarmHighVoltage
            | PackLevel2AlarmHighVoltage
            | PackLevel1AlarmLowVoltage
            | PackLevel2AlarmLowVoltage
            | CellLevel1AlarmDifferenceVoltage
            | CellLevel2AlarmDifferenceVoltage
            | CellNominalVoltage => Some("V"),
            Current => Some("A"),
            Power => Some("W"),
            BatteryLevel => Some("%"),
            MaxTemperature
            | MinTemperature
            | Temperature(_)
            | CellLevel1AlarmDifferenceTemperature
            | CellLevel2AlarmDifferenceTemperature => Some("°C"),
            RemainingCapacity | CellNominalCapacity => Some("Ah"),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Field::*;
        let name = match self {
            CellVoltage(n) => return write!(f, "cell_{n}_voltage"),
            Temperature(n) => return write!(f, "temperature_{n}"),
            CellBalanceActive(n) => return write!(f, "cell_{n}_balance_active"),
            Voltage => "voltage",
            Current => "current",
            Power => "power",
            BatteryLevel => "battery_level",
            MaxCellVoltage => "max_cell_voltage",
            MaxCellVoltageNumber => "max_cell_voltage_number",
            MinCellVoltage => "min_cell_voltage",
            MinCellVoltageNumber => "min_cell_voltage_number",
            CellVoltageDifference => "cell_voltage_difference",
            MaxTemperature => "max_temperature",
            MaxTemperatureProbeNumber => "max_temperature_probe_number",
            MinTemperature => "min_temperature",
            MinTemperatureProbeNumber => "min_temperature_probe_number",
            Status => "status",
            ChargingMosEnabled => "charging_mos_enabled",
            DischargingMosEnabled => "discharging_mos_enabled",
            BmsLife => "bms_life",
            RemainingCapacity => "remaining_capacity",
            CellsNumber => "cells_number",
            TemperatureSensorsNumber => "temperature_sensors_number",
            Cycles => "cycles",
            CellLevel1AlarmHighVoltage => "cell_level_1_alarm_high_voltage",
            CellLevel2AlarmHighVoltage => "cell_level_2_alarm_high_voltage",
            CellLevel1AlarmLowVoltage => "cell_level_1_alarm_low_voltage",
            CellLevel2AlarmLowVoltage => "cell_level_2_alarm_low_voltage",
            PackLevel1AlarmHighVoltage => "pack_level_1_alarm_high_voltage",
            PackLevel2AlarmHighVoltage => "pack_level_2_alarm_high_voltage",
            PackLevel1AlarmLowVoltage => "pack_level_1_alarm_low_voltage",
            PackLevel2AlarmLowVoltage => "pack_level_2_alarm_low_voltage",
            CellLevel1AlarmDifferenceVoltage => "cell_level_1_alarm_difference_voltage",
            CellLevel2AlarmDifferenceVoltage => "cell_level_2_alarm_difference_voltage",
            CellLevel1AlarmDifferenceTemperature => "cell_level_1_alarm_difference_temperature",
            CellLevel2AlarmDifferenceTemperature => "cell_level_2_alarm_difference_temperature",
            CellNominalCapacity => "cell_nominal_capacity",
            CellNominalVoltage => "cell_nominal_voltage",
        };
        f.write_str(name)
    }
}

/// A single decoded value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f32),
    Flag(bool),
    Text(&'static str),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Flag(b) => write!(f, "{}", if *b { "on" } else { "off" }),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// One update produced by decoding a response frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Field(Field, Value),
    /// Raw fault code bytes of a failure status frame
    FaultFrame([u8; FAULT_FRAME_SIZE]),
}

impl Reading {
    pub(crate) fn number(field: Field, value: f32) -> Self {
        Reading::Field(field, Value::Number(value))
    }

    pub(crate) fn flag(field: Field, value: bool) -> Self {
        Reading::Field(field, Value::Flag(value))
    }
}

/// Consumer of decoded telemetry.
pub trait TelemetrySink {
    fn publish(&mut self, field: Field, value: Value);

    /// Receives the opaque fault codes of a failure status response.
    fn publish_fault_frame(&mut self, codes: &[u8; FAULT_FRAME_SIZE]);

    fn publish_reading(&mut self, reading: &Reading) {
        match reading {
            Reading::Field(field, value) => self.publish(*field, *value),
            Reading::FaultFrame(codes) => self.publish_fault_frame(codes),
        }
    }
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for &mut S {
    fn publish(&mut self, field: Field, value: Value) {
        (**self).publish(field, value)
    }

    fn publish_fault_frame(&mut self, codes: &[u8; FAULT_FRAME_SIZE]) {
        (**self).publish_fault_frame(codes)
    }
}

/// Forwards only the fields somebody asked for.
///
/// The decoder always produces every field; which of them reach the
/// wrapped sink is decided here.
pub struct FieldFilter<S> {
    inner: S,
    wanted: HashSet<Field>,
    forward_fault_frames: bool,
}

impl<S: TelemetrySink> FieldFilter<S> {
    pub fn new(inner: S, wanted: impl IntoIterator<Item = Field>) -> Self {
        Self {
            inner,
            wanted: wanted.into_iter().collect(),
            forward_fault_frames: false,
        }
    }

    /// Also forward failure status frames.
    pub fn with_fault_frames(mut self) -> Self {
        self.forward_fault_frames = true;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: TelemetrySink> TelemetrySink for FieldFilter<S> {
    fn publish(&mut self, field: Field, value: Value) {
        if self.wanted.contains(&field) {
            self.inner.publish(field, value);
        }
    }

    fn publish_fault_frame(&mut self, codes: &[u8; FAULT_FRAME_SIZE]) {
        if self.forward_fault_frames {
            self.inner.publish_fault_frame(codes);
        }
    }
}

/// Test sink keeping everything it is sent, in order.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) fields: Vec<(Field, Value)>,
    pub(crate) faults: Vec<[u8; FAULT_FRAME_SIZE]>,
}

#[cfg(test)]
impl TelemetrySink for RecordingSink {
    fn publish(&mut self, field: Field, value: Value) {
        self.fields.push((field, value));
    }

    fn publish_fault_frame(&mut self, codes: &[u8; FAULT_FRAME_SIZE]) {
        self.faults.push(*codes);
    }
}

#[test]
fn test_field_units() {
    assert_eq!(Field::Voltage.unit(), Some("V"));
    assert_eq!(Field::CellVoltage(4).unit(), Some("V"));
    assert_eq!(Field::PackLevel2AlarmLowVoltage.unit(), Some("V"));
    assert_eq!(Field::Temperature(1).unit(), Some("°C"));
    assert_eq!(Field::CellBalanceActive(1).unit(), None);
}

#[test]
fn test_field_names() {
    assert_eq!(Field::Voltage.to_string(), "voltage");
    assert_eq!(Field::CellVoltage(12).to_string(), "cell_12_voltage");
    assert_eq!(Field::Temperature(2).to_string(), "temperature_2");
    assert_eq!(Field::CellBalanceActive(9).to_string(), "cell_9_balance_active");
    assert_eq!(
        Field::CellLevel2AlarmDifferenceTemperature.to_string(),
        "cell_level_2_alarm_difference_temperature"
    );
}

#[test]
fn test_field_filter_forwards_wanted_only() {
    let mut filter = FieldFilter::new(RecordingSink::default(), [Field::Voltage]);
    filter.publish(Field::Voltage, Value::Number(26.4));
    filter.publish(Field::Current, Value::Number(-3.0));
    filter.publish_fault_frame(&[0xff; FAULT_FRAME_SIZE]);

    let sink = filter.into_inner();
    assert_eq!(sink.fields, vec![(Field::Voltage, Value::Number(26.4))]);
    assert!(sink.faults.is_empty());
}

#[test]
fn test_field_filter_fault_frames() {
    let mut filter = FieldFilter::new(RecordingSink::default(), Vec::<Field>::new()).with_fault_frames();
    filter.publish_reading(&Reading::FaultFrame([1, 2, 3, 4, 5, 6, 7]));
    assert_eq!(filter.inner().faults, vec![[1, 2, 3, 4, 5, 6, 7]]);
}
