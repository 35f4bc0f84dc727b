//! Codec and receiver properties over arbitrary frames

use cmlink_protocol::{
    Frame, FrameReceiver, Timestamp, ESCAPE, FRAME_START, MAX_PAYLOAD_SIZE,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn arb_frame() -> impl Strategy<Value = Frame> {
    (
        any::<u8>(),
        any::<u8>(),
        vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
    )
        .prop_map(|(seq, cmd, payload)| Frame::new(seq, cmd, &payload).unwrap())
}

/// Payloads drawn mostly from the reserved bytes, to stress escaping
fn arb_reserved_heavy_frame() -> impl Strategy<Value = Frame> {
    let byte = prop_oneof![Just(FRAME_START), Just(ESCAPE), any::<u8>()];
    (byte.clone(), byte.clone(), vec(byte, 0..=32))
        .prop_map(|(seq, cmd, payload)| Frame::new(seq, cmd, &payload).unwrap())
}

proptest! {
    #[test]
    fn parse_reverses_encode(frame in arb_frame()) {
        let encoded = frame.encode_to_vec().unwrap();
        prop_assert_eq!(encoded[0], FRAME_START);
        prop_assert_eq!(Frame::parse(&encoded[1..]).unwrap(), frame);
    }

    #[test]
    fn marker_only_appears_first(frame in arb_reserved_heavy_frame()) {
        let encoded = frame.encode_to_vec().unwrap();
        prop_assert!(!encoded[1..].contains(&FRAME_START));
        prop_assert_eq!(Frame::parse(&encoded[1..]).unwrap(), frame);
    }

    #[test]
    fn single_bit_flip_is_rejected(
        frame in arb_reserved_heavy_frame(),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let encoded = frame.encode_to_vec().unwrap();
        let mut corrupted = encoded.clone();
        let position = 1 + index.index(encoded.len() - 1);
        corrupted[position] ^= 1 << bit;

        prop_assert!(Frame::parse(&corrupted[1..]).is_err());
    }

    #[test]
    fn receiver_resyncs_after_garbage(
        garbage in vec(any::<u8>(), 0..64),
        frame in arb_frame(),
    ) {
        let encoded = frame.encode_to_vec().unwrap();
        let mut receiver = FrameReceiver::new();
        let now = Timestamp::ZERO;

        let mut emitted = Vec::new();
        for &byte in garbage.iter().chain(encoded.iter()) {
            if let Some(parsed) = receiver.feed(byte, now) {
                emitted.push(parsed);
            }
        }

        prop_assert_eq!(emitted.len(), 1);
        prop_assert_eq!(&emitted[0], &frame);
    }

    #[test]
    fn receiver_handles_back_to_back_frames(
        first in arb_reserved_heavy_frame(),
        second in arb_reserved_heavy_frame(),
    ) {
        let mut receiver = FrameReceiver::new();
        let now = Timestamp::ZERO;

        let mut emitted = Vec::new();
        let first_bytes = first.encode_to_vec().unwrap();
        let second_bytes = second.encode_to_vec().unwrap();
        for &byte in first_bytes.iter().chain(second_bytes.iter()) {
            if let Some(parsed) = receiver.feed(byte, now) {
                emitted.push(parsed);
            }
        }

        prop_assert_eq!(emitted, vec![first, second]);
    }
}
