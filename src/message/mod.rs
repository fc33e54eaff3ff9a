//! Decoding of validated response frames into telemetry readings.
//!
//! Every command id maps to one message type wrapping the raw 8 byte payload.
//! The message types know which bytes hold which field and how to scale them,
//! and turn themselves into a list of [`Reading`]s. No state is kept between
//! frames: multi-part responses (cell voltages, balance flags) carry their own
//! sub-index in the payload.

use log::{trace, warn};

use crate::frame::{
    validate, Command, FrameError, ResponseFrame, FRAME_SIZE, PAYLOAD_SIZE, RESPONSE_MARKER,
    START_BYTE,
};
use crate::telemetry::{Reading, TelemetrySink};

mod balance_message;
mod cell_voltage_message;
mod failure_message;
mod mosfet_message;
mod range_message;
mod soc_message;
mod status_message;
mod temperature_message;
mod threshold_message;

pub use balance_message::BalanceMessage;
pub use cell_voltage_message::CellVoltageMessage;
pub use failure_message::FailureMessage;
pub use mosfet_message::{ChargeState, MosfetMessage};
pub use range_message::{TemperatureRangeMessage, VoltageRangeMessage};
pub use soc_message::SocMessage;
pub use status_message::StatusMessage;
pub use temperature_message::TemperatureMessage;
pub use threshold_message::{
    CellThresholdsMessage, NominalMessage, PackThresholdsMessage, RestThresholdsMessage,
};

/// The BMS adds this to every temperature so it never has to send a negative number.
pub const TEMPERATURE_OFFSET: i16 = 40;
/// The BMS adds this to the current (in 0.1 A) so it never has to send a negative number.
pub const CURRENT_OFFSET: i32 = 30000;
/// Highest cell number the per-cell responses are decoded for.
pub const MAX_CELLS: u8 = 16;

pub(crate) type Payload = [u8; PAYLOAD_SIZE];

/// A validated response, tagged by command id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    BatteryLevel(SocMessage),
    MinMaxVoltage(VoltageRangeMessage),
    MinMaxTemperature(TemperatureRangeMessage),
    Mosfet(MosfetMessage),
    Status(StatusMessage),
    CellVoltage(CellVoltageMessage),
    Temperature(TemperatureMessage),
    Balance(BalanceMessage),
    FailureStatus(FailureMessage),
    CellThresholds(CellThresholdsMessage),
    PackThresholds(PackThresholdsMessage),
    RestThresholds(RestThresholdsMessage),
    NominalCapacity(NominalMessage),
}

impl Message {
    pub fn new(command: Command, payload: Payload) -> Self {
        match command {
            Command::BatteryLevel => Message::BatteryLevel(SocMessage::new(payload)),
            Command::MinMaxVoltage => Message::MinMaxVoltage(VoltageRangeMessage::new(payload)),
            Command::MinMaxTemperature => {
                Message::MinMaxTemperature(TemperatureRangeMessage::new(payload))
            }
            Command::Mosfet => Message::Mosfet(MosfetMessage::new(payload)),
            Command::Status => Message::Status(StatusMessage::new(payload)),
            Command::CellVoltage => Message::CellVoltage(CellVoltageMessage::new(payload)),
            Command::Temperature => Message::Temperature(TemperatureMessage::new(payload)),
            Command::Balance => Message::Balance(BalanceMessage::new(payload)),
            Command::FailureStatus => Message::FailureStatus(FailureMessage::new(payload)),
            Command::CellThresholds => Message::CellThresholds(CellThresholdsMessage::new(payload)),
            Command::PackThresholds => Message::PackThresholds(PackThresholdsMessage::new(payload)),
            Command::RestThresholds => Message::RestThresholds(RestThresholdsMessage::new(payload)),
            Command::NominalCapacity => Message::NominalCapacity(NominalMessage::new(payload)),
        }
    }

    /// The field updates carried by this message.
    pub fn readings(&self) -> Vec<Reading> {
        match self {
            Message::BatteryLevel(m) => m.readings(),
            Message::MinMaxVoltage(m) => m.readings(),
            Message::MinMaxTemperature(m) => m.readings(),
            Message::Mosfet(m) => m.readings(),
            Message::Status(m) => m.readings(),
            Message::CellVoltage(m) => m.readings(),
            Message::Temperature(m) => m.readings(),
            Message::Balance(m) => m.readings(),
            Message::FailureStatus(m) => m.readings(),
            Message::CellThresholds(m) => m.readings(),
            Message::PackThresholds(m) => m.readings(),
            Message::RestThresholds(m) => m.readings(),
            Message::NominalCapacity(m) => m.readings(),
        }
    }
}

impl TryFrom<&ResponseFrame> for Message {
    type Error = FrameError;

    fn try_from(frame: &ResponseFrame) -> Result<Self, Self::Error> {
        let command = Command::try_from(frame.command_id())?;
        Ok(Message::new(command, *frame.payload()))
    }
}

/// Decode every response frame found in `buffer` and publish the results.
///
/// The buffer is scanned for start flags. A candidate needs a full frame's worth
/// of bytes and the response marker, otherwise the scan moves on by one byte.
/// Candidates are checksummed; either way the scan then skips the whole frame.
///
/// Returns the number of frames that were decoded.
pub fn decode_buffer<S: TelemetrySink + ?Sized>(buffer: &[u8], sink: &mut S) -> usize {
    let mut decoded = 0;
    let mut pos = 0;

    while let Some(offset) = buffer[pos..].iter().position(|&b| b == START_BYTE) {
        let start = pos + offset;
        let candidate = buffer[start..]
            .first_chunk::<FRAME_SIZE>()
            .filter(|bytes| bytes[1] == RESPONSE_MARKER);
        let Some(bytes) = candidate else {
            pos = start + 1;
            continue;
        };

        match validate(bytes) {
            Ok(frame) => {
                if dispatch(&frame, sink) {
                    decoded += 1;
                }
            }
            Err(err) => warn!("Dropping frame {}: {err}", hex::encode(bytes)),
        }
        pos = start + FRAME_SIZE;
    }

    decoded
}

fn dispatch<S: TelemetrySink + ?Sized>(frame: &ResponseFrame, sink: &mut S) -> bool {
    let message = match Message::try_from(frame) {
        Ok(message) => message,
        Err(err) => {
            trace!("Ignoring response: {err}");
            return false;
        }
    };

    for reading in message.readings() {
        trace!("Decoded {reading:?}");
        sink.publish_reading(&reading);
    }
    true
}

pub(crate) fn u16_at(payload: &Payload, i: usize) -> u16 {
    u16::from_be_bytes([payload[i], payload[i + 1]])
}

pub(crate) fn u32_at(payload: &Payload, i: usize) -> u32 {
    u32::from_be_bytes([payload[i], payload[i + 1], payload[i + 2], payload[i + 3]])
}

pub(crate) fn celsius(raw: u8) -> f32 {
    (raw as i16 - TEMPERATURE_OFFSET) as f32
}

#[cfg(test)]
use crate::telemetry::{Field, RecordingSink, Value};

#[test]
fn test_decode_buffer_single_frame() {
    let buffer = hex::decode("a5019008012c00007530000010").unwrap();
    let mut sink = RecordingSink::default();
    assert_eq!(decode_buffer(&buffer, &mut sink), 1);
    assert_eq!(
        sink.fields,
        vec![
            (Field::Voltage, Value::Number(30.0)),
            (Field::Current, Value::Number(0.0)),
            (Field::Power, Value::Number(0.0)),
            (Field::BatteryLevel, Value::Number(0.0)),
        ]
    );
}

#[test]
fn test_decode_buffer_two_frames_in_order() {
    // battery level followed by min/max temperature
    let buffer =
        hex::decode("a5019008012c00007530000010a50192085a014b0200000000e8").unwrap();
    let mut sink = RecordingSink::default();
    assert_eq!(decode_buffer(&buffer, &mut sink), 2);
    let names: Vec<String> = sink.fields.iter().map(|(f, _)| f.to_string()).collect();
    assert_eq!(
        names,
        [
            "voltage",
            "current",
            "power",
            "battery_level",
            "max_temperature",
            "max_temperature_probe_number",
            "min_temperature",
            "min_temperature_probe_number",
        ]
    );
    assert_eq!(sink.fields[4].1, Value::Number(50.0));
    assert_eq!(sink.fields[6].1, Value::Number(35.0));
}

#[test]
fn test_decode_buffer_skips_bad_checksum() {
    let buffer =
        hex::decode("a5019008012c00007530000099a50192085a014b0200000000e8").unwrap();
    let mut sink = RecordingSink::default();
    assert_eq!(decode_buffer(&buffer, &mut sink), 1);
    assert_eq!(sink.fields[0].0, Field::MaxTemperature);
}

#[test]
fn test_decode_buffer_bad_checksum_skips_whole_frame() {
    // the bad candidate at 0 hides a valid frame starting at offset 2
    let buffer = hex::decode("a501a5019008012c0000753000001000").unwrap();
    let mut sink = RecordingSink::default();
    assert_eq!(decode_buffer(&buffer, &mut sink), 0);
    assert!(sink.fields.is_empty());
}

#[test]
fn test_decode_buffer_garbage_and_short_tail() {
    // a stray start flag without response marker, then a frame, then a truncated frame
    let buffer = hex::decode("00a5ffa5019008012c00007530000010a50190").unwrap();
    let mut sink = RecordingSink::default();
    assert_eq!(decode_buffer(&buffer, &mut sink), 1);
    assert_eq!(sink.fields.len(), 4);
}

#[test]
fn test_decode_buffer_ignores_unknown_command() {
    let mut bytes = [0xa5, 0x01, 0x42, 0x08, 1, 2, 3, 4, 5, 6, 7, 8, 0];
    bytes[12] = crate::frame::checksum(&bytes[..12]);
    let mut sink = RecordingSink::default();
    assert_eq!(decode_buffer(&bytes, &mut sink), 0);
    assert!(sink.fields.is_empty());
}

#[test]
fn test_decode_buffer_failure_status() {
    let mut bytes = [0xa5, 0x01, 0x98, 0x08, 1, 0, 4, 0, 0, 0, 0x80, 0x03, 0];
    bytes[12] = crate::frame::checksum(&bytes[..12]);
    let mut sink = RecordingSink::default();
    assert_eq!(decode_buffer(&bytes, &mut sink), 1);
    assert!(sink.fields.is_empty());
    assert_eq!(sink.faults, vec![[1, 0, 4, 0, 0, 0, 0x80]]);
}

#[test]
fn test_celsius() {
    assert_eq!(celsius(0x5a), 50.0);
    assert_eq!(celsius(0), -40.0);
}
