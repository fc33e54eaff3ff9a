//! The byte channel the driver talks to the BMS through.

use std::io::{Read, Write};

use anyhow::Context;
use tokio::time::Duration;

/// A non-blocking bidirectional byte stream with no notion of frames.
///
/// Errors are passed straight up to whoever drives the client; retrying or
/// reconnecting is the transport's business.
pub trait Transport {
    /// Number of bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> anyhow::Result<usize>;

    /// Read one byte. Only called when [`Transport::bytes_available`] says one is there.
    fn read_byte(&mut self) -> anyhow::Result<u8>;

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()>;

    fn flush(&mut self) -> anyhow::Result<()>;

    /// Append everything that is currently buffered to `out` and return how many bytes that was.
    fn read_available(&mut self, out: &mut Vec<u8>) -> anyhow::Result<usize> {
        let mut count = 0;
        while self.bytes_available()? > 0 {
            out.push(self.read_byte()?);
            count += 1;
        }
        Ok(count)
    }
}

/// A UART opened through the `serialport` crate.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Reads only ever ask for bytes that are already buffered, so this is just a safety net.
    const READ_TIMEOUT: Duration = Duration::from_millis(50);

    /// Open `path` as 8N1 at `baud_rate`.
    pub fn open(path: &str, baud_rate: u32) -> anyhow::Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Self::READ_TIMEOUT)
            .open()
            .with_context(|| format!("Failed to open serial port {path}"))?;
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn bytes_available(&mut self) -> anyhow::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> anyhow::Result<u8> {
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.port.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        Write::flush(&mut self.port)?;
        Ok(())
    }

    fn read_available(&mut self, out: &mut Vec<u8>) -> anyhow::Result<usize> {
        let available = self.bytes_available()?;
        if available == 0 {
            return Ok(0);
        }
        let start = out.len();
        out.resize(start + available, 0);
        let read = self.port.read(&mut out[start..])?;
        out.truncate(start + read);
        Ok(read)
    }
}

#[cfg(test)]
struct LoopbackTransport {
    rx: std::collections::VecDeque<u8>,
}

#[cfg(test)]
impl Transport for LoopbackTransport {
    fn bytes_available(&mut self) -> anyhow::Result<usize> {
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> anyhow::Result<u8> {
        self.rx.pop_front().context("nothing to read")
    }

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.rx.extend(bytes);
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn test_read_available_drains_everything() {
    let mut transport = LoopbackTransport { rx: Default::default() };
    transport.write(&[1, 2, 3]).unwrap();

    let mut out = vec![0xaa];
    assert_eq!(transport.read_available(&mut out).unwrap(), 3);
    assert_eq!(out, vec![0xaa, 1, 2, 3]);
    assert_eq!(transport.read_available(&mut out).unwrap(), 0);
}
