//! Byte-stream frame receiver
//!
//! Rebuilds frames from the raw serial byte stream. Bytes outside a frame are
//! ignored until the next START marker, which makes the receiver
//! resynchronize after line noise, partial frames, or a node restarting
//! mid-transmission.
//!
//! The accumulator belongs to the receiving task alone and is never shared.

use heapless::Vec;

use crate::frame::{Frame, FRAME_START, MAX_STUFFED_SIZE, MIN_FRAME_SIZE};
use crate::time::Timestamp;

/// Maximum gap between two bytes of one frame
pub const INTER_BYTE_TIMEOUT_MS: u32 = 100;

/// Escaped bytes that may follow the START marker
const ACCUMULATOR_SIZE: usize = MAX_STUFFED_SIZE - 1;

/// Receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveState {
    /// Discarding bytes until a START marker
    WaitingForMarker,
    /// Collecting the bytes of a frame
    AccumulatingFrame,
}

/// Counters for discarded input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReceiverStats {
    /// Frames successfully extracted
    pub frames: u32,
    /// Accumulator overflowed before a valid frame was found
    pub overflows: u32,
    /// Partial frame abandoned because a new START marker arrived
    pub restarts: u32,
    /// Partial frame abandoned after the inter-byte timeout
    pub stale_resets: u32,
}

impl ReceiverStats {
    /// Total framing errors
    pub fn framing_errors(&self) -> u32 {
        self.overflows + self.restarts + self.stale_resets
    }
}

/// State machine that turns bytes into frames
#[derive(Debug, Clone)]
pub struct FrameReceiver {
    state: ReceiveState,
    buffer: Vec<u8, ACCUMULATOR_SIZE>,
    last_byte_at: Timestamp,
    inter_byte_timeout_ms: u32,
    stats: ReceiverStats,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReceiver {
    /// Create a receiver with the default inter-byte timeout
    pub fn new() -> Self {
        Self::with_timeout(INTER_BYTE_TIMEOUT_MS)
    }

    /// Create a receiver with a custom inter-byte timeout
    pub fn with_timeout(inter_byte_timeout_ms: u32) -> Self {
        Self {
            state: ReceiveState::WaitingForMarker,
            buffer: Vec::new(),
            last_byte_at: Timestamp::ZERO,
            inter_byte_timeout_ms,
            stats: ReceiverStats::default(),
        }
    }

    /// Reset the receiver state
    pub fn reset(&mut self) {
        self.state = ReceiveState::WaitingForMarker;
        self.buffer.clear();
    }

    pub fn state(&self) -> ReceiveState {
        self.state
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Drop a partial frame if the line has been idle too long
    ///
    /// Called before every byte, and periodically by the receiving task so an
    /// idle line also clears a stalled frame. Returns true if a partial frame
    /// was discarded.
    pub fn check_timeout(&mut self, now: Timestamp) -> bool {
        if self.state == ReceiveState::AccumulatingFrame
            && now.millis_since(self.last_byte_at) > self.inter_byte_timeout_ms as u64
        {
            self.stats.stale_resets += 1;
            self.reset();
            return true;
        }
        false
    }

    /// Feed a single byte to the receiver
    ///
    /// Returns `Some(frame)` when the byte completes a valid frame.
    pub fn feed(&mut self, byte: u8, now: Timestamp) -> Option<Frame> {
        self.check_timeout(now);
        self.last_byte_at = now;

        if byte == FRAME_START {
            // START never appears inside an escaped frame, so it always
            // begins a new one
            if self.state == ReceiveState::AccumulatingFrame && !self.buffer.is_empty() {
                self.stats.restarts += 1;
            }
            self.buffer.clear();
            self.state = ReceiveState::AccumulatingFrame;
            return None;
        }

        match self.state {
            // Silently ignore non-START bytes while waiting
            ReceiveState::WaitingForMarker => None,
            ReceiveState::AccumulatingFrame => {
                if self.buffer.push(byte).is_err() {
                    self.stats.overflows += 1;
                    self.reset();
                    return None;
                }

                if self.buffer.len() < MIN_FRAME_SIZE {
                    return None;
                }

                match Frame::parse(&self.buffer) {
                    Ok(frame) => {
                        self.stats.frames += 1;
                        self.reset();
                        Some(frame)
                    }
                    // Not complete yet (or corrupt); keep accumulating
                    Err(_) => None,
                }
            }
        }
    }

    /// Feed multiple bytes to the receiver
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8], now: Timestamp) -> Option<Frame> {
        bytes.iter().find_map(|&byte| self.feed(byte, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_receive_single_frame() {
        let frame = Frame::new(7, 0x11, &[0x04, 0xB0]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut receiver = FrameReceiver::new();
        let parsed = receiver.feed_bytes(&encoded, at(0)).unwrap();

        assert_eq!(parsed, frame);
        assert_eq!(receiver.state(), ReceiveState::WaitingForMarker);
        assert_eq!(receiver.stats().frames, 1);
    }

    #[test]
    fn test_resync_after_garbage() {
        let frame = Frame::empty(3, 0x22);
        let encoded = frame.encode_to_vec().unwrap();

        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(&[0x00, 0xFF, 0x12, 0x7D, 0x34]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let mut receiver = FrameReceiver::new();
        let parsed = receiver.feed_bytes(&data, at(0)).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_new_marker_abandons_partial_frame() {
        let frame = Frame::new(9, 0xA1, &[0x03, 0xE8]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut receiver = FrameReceiver::new();
        // Partial frame, then a complete one
        assert!(receiver.feed_bytes(&encoded[..4], at(0)).is_none());
        let parsed = receiver.feed_bytes(&encoded, at(1)).unwrap();

        assert_eq!(parsed, frame);
        assert_eq!(receiver.stats().restarts, 1);
    }

    #[test]
    fn test_stale_partial_frame_is_dropped() {
        let frame = Frame::new(1, 0x12, &[0x00, 0x32]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut receiver = FrameReceiver::new();
        assert!(receiver.feed_bytes(&encoded[..3], at(0)).is_none());

        // The remainder arrives too late to belong to the same frame
        assert!(receiver.feed_bytes(&encoded[3..], at(150)).is_none());
        assert_eq!(receiver.stats().stale_resets, 1);
        assert_eq!(receiver.state(), ReceiveState::WaitingForMarker);
    }

    #[test]
    fn test_slow_but_timely_bytes_are_accepted() {
        let frame = Frame::new(1, 0x12, &[0x00, 0x32]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut receiver = FrameReceiver::new();
        let mut result = None;
        for (i, &byte) in encoded.iter().enumerate() {
            result = receiver.feed(byte, at(i as u64 * 90));
        }
        assert_eq!(result, Some(frame));
    }

    #[test]
    fn test_check_timeout_while_idle() {
        let mut receiver = FrameReceiver::new();
        receiver.feed(FRAME_START, at(0));
        receiver.feed(0x00, at(5));

        assert!(!receiver.check_timeout(at(100)));
        assert!(receiver.check_timeout(at(106)));
        assert!(!receiver.check_timeout(at(500)));
    }

    #[test]
    fn test_corrupt_frame_then_valid_frame() {
        let good = Frame::new(2, 0x80, &[0x02]).unwrap();
        let mut bad = good.encode_to_vec().unwrap();
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;

        let mut receiver = FrameReceiver::new();
        assert!(receiver.feed_bytes(&bad, at(0)).is_none());
        let parsed = receiver
            .feed_bytes(&good.encode_to_vec().unwrap(), at(1))
            .unwrap();
        assert_eq!(parsed, good);
    }

    #[test]
    fn test_overflow_resets() {
        let mut receiver = FrameReceiver::new();
        receiver.feed(FRAME_START, at(0));
        // A declared length of 0xFF can never complete
        for _ in 0..ACCUMULATOR_SIZE + 1 {
            assert!(receiver.feed(0xFF, at(0)).is_none());
        }
        assert_eq!(receiver.stats().overflows, 1);
        assert_eq!(receiver.state(), ReceiveState::WaitingForMarker);
    }
}
