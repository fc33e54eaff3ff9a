//! The 13 byte frame used in both directions on the Daly UART bus.
//!
//! Byte | Meaning
//! -----|----------------------------------------------------------
//! 0    | Start flag, always `0xA5`
//! 1    | Request: address of the BMS. Response: always `0x01`
//! 2    | Command id
//! 3    | Payload length, always `0x08`
//! 4-11 | Payload
//! 12   | Checksum, the low byte of the sum of bytes 0-11

use std::fmt;

pub const FRAME_SIZE: usize = 13;
pub const PAYLOAD_SIZE: usize = 8;
pub const START_BYTE: u8 = 0xa5;
pub const RESPONSE_MARKER: u8 = 0x01;
pub const DATA_LENGTH: u8 = 0x08;
/// Address most Daly boards answer to out of the box.
pub const DEFAULT_ADDRESS: u8 = 0x80;

/// Errors raised while interpreting bytes received from the BMS.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("checksum mismatch: calculated {calculated:#04x}, received {received:#04x}")]
    ChecksumMismatch { calculated: u8, received: u8 },
    #[error("unknown command id {0:#04x}")]
    UnknownCommand(u8),
}

/// The telemetry queries understood by the BMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    BatteryLevel = 0x90,
    MinMaxVoltage = 0x91,
    MinMaxTemperature = 0x92,
    Mosfet = 0x93,
    Status = 0x94,
    CellVoltage = 0x95,
    Temperature = 0x96,
    Balance = 0x97,
    FailureStatus = 0x98,
    CellThresholds = 0x59,
    PackThresholds = 0x5a,
    RestThresholds = 0x5e,
    NominalCapacity = 0x50,
}

impl Command {
    /// The order in which one poll cycle queries the BMS. The device only ever
    /// answers the most recently requested id, so this order is part of the protocol.
    pub const POLL_ORDER: [Command; 13] = [
        Command::BatteryLevel,
        Command::MinMaxVoltage,
        Command::MinMaxTemperature,
        Command::Mosfet,
        Command::Status,
        Command::CellVoltage,
        Command::Temperature,
        Command::Balance,
        Command::FailureStatus,
        Command::CellThresholds,
        Command::PackThresholds,
        Command::RestThresholds,
        Command::NominalCapacity,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = FrameError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Command::POLL_ORDER
            .into_iter()
            .find(|command| command.id() == id)
            .ok_or(FrameError::UnknownCommand(id))
    }
}

/// A request ready to be written to the bus.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestFrame([u8; FRAME_SIZE]);

impl RequestFrame {
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.0
    }
}

impl fmt::Debug for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestFrame({})", hex::encode(self.0))
    }
}

/// A response whose checksum has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    command_id: u8,
    payload: [u8; PAYLOAD_SIZE],
}

impl ResponseFrame {
    pub fn command_id(&self) -> u8 {
        self.command_id
    }

    pub fn payload(&self) -> &[u8; PAYLOAD_SIZE] {
        &self.payload
    }
}

/// Build the request asking the BMS at `address` for `command`.
pub fn build_request(command: Command, address: u8) -> RequestFrame {
    let mut bytes = [0u8; FRAME_SIZE];
    bytes[0] = START_BYTE;
    bytes[1] = address;
    bytes[2] = command.id();
    bytes[3] = DATA_LENGTH;
    // Payload stays zeroed, so the sum over the header is the sum over 0-11.
    bytes[FRAME_SIZE - 1] = checksum(&bytes[..4]);
    RequestFrame(bytes)
}

/// Check the trailing checksum of a candidate response frame.
pub fn validate(bytes: &[u8; FRAME_SIZE]) -> Result<ResponseFrame, FrameError> {
    let calculated = checksum(&bytes[..FRAME_SIZE - 1]);
    let received = bytes[FRAME_SIZE - 1];
    if calculated != received {
        return Err(FrameError::ChecksumMismatch { calculated, received });
    }

    let mut payload = [0u8; PAYLOAD_SIZE];
    payload.copy_from_slice(&bytes[4..4 + PAYLOAD_SIZE]);
    Ok(ResponseFrame { command_id: bytes[2], payload })
}

/// Low byte of the sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

#[cfg(test)]
fn frame_from_hex(h: &str) -> [u8; FRAME_SIZE] {
    hex::decode(h).unwrap().try_into().unwrap()
}

#[test]
fn test_build_request_battery_level() {
    let request = build_request(Command::BatteryLevel, DEFAULT_ADDRESS);
    assert_eq!(hex::encode(request.as_bytes()), "a58090080000000000000000bd");
}

#[test]
fn test_build_request_wraps_checksum() {
    let request = build_request(Command::CellThresholds, 0xff);
    let expected = 0xa5u8.wrapping_add(0xff).wrapping_add(0x59).wrapping_add(0x08);
    assert_eq!(request.as_bytes()[12], expected);
}

#[test]
fn test_validate_happy() {
    let frame = validate(&frame_from_hex("a5019008012c00007530000010")).unwrap();
    assert_eq!(frame.command_id(), 0x90);
    assert_eq!(frame.payload(), &[0x01, 0x2c, 0x00, 0x00, 0x75, 0x30, 0x00, 0x00]);
}

#[test]
fn test_validate_bad_checksum() {
    let result = validate(&frame_from_hex("a5019008012c00007530000011"));
    assert_eq!(
        result,
        Err(FrameError::ChecksumMismatch { calculated: 0x10, received: 0x11 })
    );
}

#[test]
fn test_validate_accepts_built_request() {
    for command in Command::POLL_ORDER {
        let request = build_request(command, DEFAULT_ADDRESS);
        assert!(validate(request.as_bytes()).is_ok(), "{command:?}");
    }
}

#[test]
fn test_command_from_id() {
    assert_eq!(Command::try_from(0x5e), Ok(Command::RestThresholds));
    assert_eq!(Command::try_from(0x42), Err(FrameError::UnknownCommand(0x42)));
}
