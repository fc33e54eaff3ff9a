//! A simulated BMS that answers requests from canned payloads.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use anyhow::Context;
use dalyread::frame::checksum;
use dalyread::{Command, Transport};

/// Build a response frame for `command` carrying `payload`.
pub fn response(command: u8, payload: [u8; 8]) -> Vec<u8> {
    let mut frame = vec![0xa5, 0x01, command, 0x08];
    frame.extend_from_slice(&payload);
    frame.push(checksum(&frame));
    frame
}

pub struct MockBms {
    answers: HashMap<u8, Vec<Vec<u8>>>,
    rx: VecDeque<u8>,
    /// Ids of every request received, in order
    pub requests: Vec<u8>,
    /// Bytes sent ahead of the next answer
    pub noise: Vec<u8>,
}

impl MockBms {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            rx: VecDeque::new(),
            requests: Vec::new(),
            noise: Vec::new(),
        }
    }

    /// A 16 cell pack with every command answered.
    pub fn typical() -> Self {
        let mut bms = Self::new();
        bms.answer(Command::BatteryLevel, vec![[0x01, 0x09, 0x00, 0x00, 0x74, 0xfe, 0x03, 0x69]]);
        bms.answer(Command::MinMaxVoltage, vec![[0x0d, 0x16, 0x04, 0x0c, 0xfa, 0x07, 0x00, 0x00]]);
        bms.answer(Command::MinMaxTemperature, vec![[0x5a, 0x01, 0x1e, 0x02, 0, 0, 0, 0]]);
        bms.answer(Command::Mosfet, vec![[0x02, 0x01, 0x01, 0x2a, 0x00, 0x01, 0x5f, 0x90]]);
        bms.answer(Command::Status, vec![[0x10, 0x02, 0, 0, 0, 0x01, 0x2c, 0]]);
        bms.answer(Command::CellVoltage, (1..=6).map(cell_voltage_frame).collect());
        bms.answer(Command::Temperature, vec![[0x01, 0x5a, 0x3d, 0, 0, 0, 0, 0]]);
        bms.answer(
            Command::Balance,
            vec![[0x00, 0x00, 0x01, 0, 0, 0, 0, 0], [0x01, 0, 0, 0, 0, 0, 0, 0x01]],
        );
        bms.answer(Command::FailureStatus, vec![[0, 0, 0x04, 0, 0, 0, 0, 0]]);
        bms.answer(Command::CellThresholds, vec![[0x0e, 0x42, 0x0e, 0x74, 0x0a, 0xf0, 0x09, 0xc4]]);
        bms.answer(Command::PackThresholds, vec![[0x01, 0x24, 0x01, 0x28, 0x00, 0xe0, 0x00, 0xc8]]);
        bms.answer(Command::RestThresholds, vec![[0x01, 0xf4, 0x03, 0xe8, 0x05, 0x0a, 0, 0]]);
        bms.answer(Command::NominalCapacity, vec![[0x00, 0x01, 0x86, 0xa0, 0, 0, 0x0c, 0x80]]);
        bms
    }

    pub fn answer(&mut self, command: Command, payloads: Vec<[u8; 8]>) {
        let frames = payloads
            .into_iter()
            .map(|payload| response(command.id(), payload))
            .collect();
        self.answers.insert(command.id(), frames);
    }

    /// Replace the answer to `command` with raw bytes.
    pub fn answer_raw(&mut self, command: Command, bytes: Vec<u8>) {
        self.answers.insert(command.id(), vec![bytes]);
    }
}

/// Cell voltages frame `n`, cell `c` reads 3.300 V + c mV.
fn cell_voltage_frame(n: u8) -> [u8; 8] {
    let mut payload = [n, 0, 0, 0, 0, 0, 0, 0];
    for i in 0..3 {
        let cell = (n as u16 - 1) * 3 + i as u16 + 1;
        let mv = 3300 + cell;
        payload[1 + 2 * i..3 + 2 * i].copy_from_slice(&mv.to_be_bytes());
    }
    payload
}

impl Transport for MockBms {
    fn bytes_available(&mut self) -> anyhow::Result<usize> {
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> anyhow::Result<u8> {
        self.rx.pop_front().context("read with nothing available")
    }

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        assert_eq!(bytes.len(), 13, "requests are always 13 bytes");
        assert_eq!(bytes[12], checksum(&bytes[..12]), "request checksum");
        let id = bytes[2];
        self.requests.push(id);

        self.rx.extend(self.noise.drain(..));
        if let Some(frames) = self.answers.get(&id) {
            for frame in frames {
                self.rx.extend(frame);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
