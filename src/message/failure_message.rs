use super::Payload;
use crate::telemetry::{Reading, FAULT_FRAME_SIZE};

/// Response to 0x98. The fault bits are passed on untouched; what each bit
/// means is up to whoever listens for fault frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessage(Payload);

impl FailureMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub fn fault_codes(&self) -> [u8; FAULT_FRAME_SIZE] {
        let mut codes = [0u8; FAULT_FRAME_SIZE];
        codes.copy_from_slice(&self.0[..FAULT_FRAME_SIZE]);
        codes
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        vec![Reading::FaultFrame(self.fault_codes())]
    }
}

#[test]
fn test_fault_codes_drop_last_byte() {
    let message = FailureMessage::new([1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(message.fault_codes(), [1, 2, 3, 4, 5, 6, 7]);
}
