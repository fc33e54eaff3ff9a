//! Property tests for the frame codec, the receiver and the decoder.

mod common;

use common::response;
use dalyread::frame::{build_request, checksum, validate, FRAME_SIZE};
use dalyread::message::decode_buffer;
use dalyread::{BatteryState, Command, FrameReceiver};
use proptest::prelude::*;
use tokio::time::Instant;

fn arb_command() -> impl Strategy<Value = Command> {
    proptest::sample::select(Command::POLL_ORDER.to_vec())
}

/// Feed `bytes` through a receiver and decode every frame it hands out.
fn receive_all(bytes: &[u8], state: &mut BatteryState) -> usize {
    let mut receiver = FrameReceiver::default();
    let now = Instant::now();
    bytes
        .iter()
        .filter_map(|&byte| receiver.push(byte, now))
        .map(|frame| decode_buffer(&frame, &mut *state))
        .sum()
}

// ── Codec ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn request_always_validates(command in arb_command(), address in any::<u8>()) {
        let request = build_request(command, address);
        let frame = validate(request.as_bytes());
        prop_assert!(frame.is_ok());
        prop_assert_eq!(frame.unwrap().command_id(), command.id());
    }

    /// Changing any one payload byte of a response changes its sum, so the
    /// checksum no longer matches.
    #[test]
    fn payload_corruption_is_detected(
        command in arb_command(),
        payload in any::<[u8; 8]>(),
        index in 4usize..=11,
        delta in 1u8..=255u8,
    ) {
        let mut bytes: [u8; FRAME_SIZE] = response(command.id(), payload).try_into().unwrap();
        prop_assert!(validate(&bytes).is_ok());
        bytes[index] = bytes[index].wrapping_add(delta);
        prop_assert!(validate(&bytes).is_err());
    }

    #[test]
    fn checksum_is_sum_mod_256(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let expected = bytes.iter().map(|&b| b as u32).sum::<u32>() % 256;
        prop_assert_eq!(checksum(&bytes) as u32, expected);
    }
}

// ── Receiver and decoder ─────────────────────────────────────

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut state = BatteryState::new();
        let decoded = receive_all(&bytes, &mut state);
        prop_assert!(decoded <= bytes.len() / FRAME_SIZE);

        let mut direct = BatteryState::new();
        prop_assert!(decode_buffer(&bytes, &mut direct) <= bytes.len() / FRAME_SIZE);
    }

    /// Line noise that never contains a start flag does not hide the frame after it.
    #[test]
    fn frame_after_noise_is_decoded(
        noise in proptest::collection::vec(any::<u8>().prop_filter("no start flag", |b| *b != 0xa5), 0..64),
        command in arb_command(),
        payload in any::<[u8; 8]>(),
    ) {
        let mut bytes = noise;
        bytes.extend(response(command.id(), payload));

        let mut state = BatteryState::new();
        prop_assert_eq!(receive_all(&bytes, &mut state), 1);

        let mut direct = BatteryState::new();
        prop_assert_eq!(decode_buffer(&bytes, &mut direct), 1);
    }

    #[test]
    fn back_to_back_frames_are_all_decoded(
        frames in proptest::collection::vec((arb_command(), any::<[u8; 8]>()), 1..16),
    ) {
        let bytes: Vec<u8> = frames
            .iter()
            .flat_map(|(command, payload)| response(command.id(), *payload))
            .collect();

        let mut state = BatteryState::new();
        prop_assert_eq!(receive_all(&bytes, &mut state), frames.len());
    }
}
