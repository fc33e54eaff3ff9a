//! Reassembly of response frames from the raw UART byte stream.

use log::{debug, warn};
use tokio::time::{Duration, Instant};

use crate::frame::{PAYLOAD_SIZE, START_BYTE};

/// Bytes in a frame besides the payload: start flag, marker, command id, length, checksum.
const FRAME_OVERHEAD: usize = 5;
/// Index of the declared payload length within a frame.
const LENGTH_INDEX: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Waiting for a start flag, everything else is dropped.
    Idle,
    /// Collecting the bytes of one frame.
    Accumulating,
}

/// Collects bytes from the start flag up to the length the frame declares.
///
/// A frame that stops arriving half way (a byte got lost on the wire) is
/// thrown away once no byte has been seen for `stale_after`, so the receiver
/// can lock onto the next start flag instead of waiting forever.
#[derive(Debug)]
pub struct FrameReceiver {
    state: ReceiverState,
    buffer: Vec<u8>,
    last_byte_at: Option<Instant>,
    stale_after: Duration,
}

impl FrameReceiver {
    pub const DEFAULT_STALE_AFTER: Duration = Duration::from_millis(200);

    pub fn new(stale_after: Duration) -> Self {
        Self {
            state: ReceiverState::Idle,
            buffer: Vec::with_capacity(FRAME_OVERHEAD + PAYLOAD_SIZE),
            last_byte_at: None,
            stale_after,
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Drop a half received frame if the line has been quiet for too long.
    /// Returns whether anything was dropped.
    pub fn expire_stale(&mut self, now: Instant) -> bool {
        if self.state != ReceiverState::Accumulating {
            return false;
        }
        let stale = self
            .last_byte_at
            .map_or(true, |at| now.saturating_duration_since(at) >= self.stale_after);
        if stale {
            warn!(
                "No data for {:?}, dropping partial frame {}",
                self.stale_after,
                hex::encode(&self.buffer)
            );
            self.reset();
        }
        stale
    }

    /// Feed one received byte. Returns the complete frame buffer once the
    /// declared length has been reached.
    pub fn push(&mut self, byte: u8, now: Instant) -> Option<Vec<u8>> {
        self.last_byte_at = Some(now);

        if self.state == ReceiverState::Idle {
            if byte != START_BYTE {
                return None;
            }
            self.state = ReceiverState::Accumulating;
        }

        self.buffer.push(byte);
        match self.expected_len() {
            Some(len) if self.buffer.len() >= len => {
                let frame = std::mem::take(&mut self.buffer);
                debug!("RX: {}", hex::encode(&frame));
                self.reset();
                Some(frame)
            }
            _ => None,
        }
    }

    /// Frame length announced by the length byte, once it has arrived.
    fn expected_len(&self) -> Option<usize> {
        self.buffer
            .get(LENGTH_INDEX)
            .map(|&len| len as usize + FRAME_OVERHEAD)
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.state = ReceiverState::Idle;
    }
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STALE_AFTER)
    }
}

#[cfg(test)]
fn feed(receiver: &mut FrameReceiver, bytes: &[u8], now: Instant) -> Vec<Vec<u8>> {
    bytes.iter().filter_map(|b| receiver.push(*b, now)).collect()
}

#[test]
fn test_receive_whole_frame() {
    let mut receiver = FrameReceiver::default();
    let frame = hex::decode("a5019008012c00007530000010").unwrap();
    let frames = feed(&mut receiver, &frame, Instant::now());
    assert_eq!(frames, vec![frame]);
    assert_eq!(receiver.state(), ReceiverState::Idle);
}

#[test]
fn test_receive_skips_garbage_before_start() {
    let mut receiver = FrameReceiver::default();
    let frame = hex::decode("a5019008012c00007530000010").unwrap();
    let mut bytes = vec![0x00, 0x13, 0xff, 0x01];
    bytes.extend_from_slice(&frame);
    let frames = feed(&mut receiver, &bytes, Instant::now());
    assert_eq!(frames, vec![frame]);
}

#[test]
fn test_receive_back_to_back_frames() {
    let mut receiver = FrameReceiver::default();
    let bytes =
        hex::decode("a5019008012c00007530000010a50192085a014b0200000000e8").unwrap();
    let frames = feed(&mut receiver, &bytes, Instant::now());
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1][2], 0x92);
}

#[test]
fn test_receive_honours_declared_length() {
    let mut receiver = FrameReceiver::default();
    // declared length 2, so 7 bytes make a frame
    let frames = feed(&mut receiver, &[0xa5, 0x01, 0x90, 0x02, 0x11, 0x22, 0x33, 0x44], Instant::now());
    assert_eq!(frames, vec![vec![0xa5, 0x01, 0x90, 0x02, 0x11, 0x22, 0x33]]);
}

#[test]
fn test_stale_partial_frame_is_dropped() {
    let mut receiver = FrameReceiver::default();
    let t0 = Instant::now();
    let frame = hex::decode("a5019008012c00007530000010").unwrap();

    assert!(feed(&mut receiver, &frame[..6], t0).is_empty());
    assert!(!receiver.expire_stale(t0 + Duration::from_millis(199)));
    assert_eq!(receiver.state(), ReceiverState::Accumulating);

    assert!(receiver.expire_stale(t0 + Duration::from_millis(200)));
    assert_eq!(receiver.state(), ReceiverState::Idle);

    // the rest of the old frame contains no start flag and must not complete anything
    let later = t0 + Duration::from_millis(300);
    assert!(feed(&mut receiver, &frame[6..], later).is_empty());
    assert_eq!(receiver.state(), ReceiverState::Idle);
}

#[test]
fn test_slow_but_steady_bytes_are_not_stale() {
    let mut receiver = FrameReceiver::default();
    let frame = hex::decode("a5019008012c00007530000010").unwrap();
    let mut now = Instant::now();
    let mut frames = Vec::new();
    for byte in &frame {
        now += Duration::from_millis(150);
        receiver.expire_stale(now);
        frames.extend(receiver.push(*byte, now));
    }
    assert_eq!(frames, vec![frame]);
}
