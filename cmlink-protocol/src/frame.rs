//! Frame encoding and decoding.
//!
//! Logical frame (before escaping):
//! - LENGTH (1 byte): payload length (0-250)
//! - SEQ (1 byte): sequence number, echoed by the responder
//! - CMD (1 byte): opcode
//! - PAYLOAD (0-250 bytes): opcode-specific data, big-endian fields
//! - CRC (2 bytes, big-endian): CRC-16/CCITT-FALSE of LENGTH..PAYLOAD
//!
//! On the wire the logical frame is escaped and prefixed with [`FRAME_START`].

use heapless::Vec;

use crate::crc;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0x3A;

/// Escape byte
pub const ESCAPE: u8 = 0x7D;

/// XOR applied to an escaped byte
pub const ESCAPE_MASK: u8 = 0x20;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 250;

/// LENGTH + SEQ + CMD
pub const HEADER_SIZE: usize = 3;

/// CRC_H + CRC_L
pub const CRC_SIZE: usize = 2;

/// Smallest logical frame (no payload)
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CRC_SIZE;

/// Largest logical frame
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CRC_SIZE;

/// Largest wire frame: START plus every logical byte escaped
pub const MAX_STUFFED_SIZE: usize = 1 + MAX_FRAME_SIZE * 2;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Declared length disagrees with the payload or input size
    LengthMismatch,
    /// Fewer bytes than the smallest possible frame
    TooShort,
    /// Escape byte was the last byte of the input
    TruncatedEscape,
    /// Escape byte followed by a byte that does not unescape to START or ESCAPE
    InvalidEscape,
    /// CRC mismatch
    InvalidCrc,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Opcode is not part of the command set
    UnknownCommand,
    /// Payload has the wrong size or an out-of-range field
    InvalidPayload,
}

/// A parsed or constructed logical frame
///
/// The length field is always the payload length; the type cannot hold a
/// frame whose declared length disagrees with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Sequence number
    pub seq: u8,
    /// Opcode
    pub cmd: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given sequence, opcode and payload
    pub fn new(seq: u8, cmd: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            seq,
            cmd,
            payload: payload_vec,
        })
    }

    /// Create a frame from a caller-declared length
    ///
    /// Fails if `length` exceeds the maximum or disagrees with `payload`.
    pub fn with_length(length: u8, seq: u8, cmd: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if length as usize > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        if length as usize != payload.len() {
            return Err(FrameError::LengthMismatch);
        }
        Self::new(seq, cmd, payload)
    }

    /// Create a frame with no payload
    pub fn empty(seq: u8, cmd: u8) -> Self {
        Self {
            seq,
            cmd,
            payload: Vec::new(),
        }
    }

    /// Payload length as carried in the LENGTH field
    pub fn len(&self) -> u8 {
        self.payload.len() as u8
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Write LENGTH | SEQ | CMD | PAYLOAD, returning the byte count
    fn write_body(&self, logical: &mut [u8; MAX_FRAME_SIZE]) -> usize {
        let payload_len = self.payload.len();
        logical[0] = payload_len as u8;
        logical[1] = self.seq;
        logical[2] = self.cmd;
        logical[HEADER_SIZE..HEADER_SIZE + payload_len].copy_from_slice(&self.payload);
        HEADER_SIZE + payload_len
    }

    /// Encode this frame into a byte buffer, START marker included
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let mut logical = [0u8; MAX_FRAME_SIZE];
        let body_len = self.write_body(&mut logical);

        let crc = crc::crc16(&logical[..body_len]);
        logical[body_len..body_len + CRC_SIZE].copy_from_slice(&crc.to_be_bytes());
        let logical_len = body_len + CRC_SIZE;

        let (start, rest) = buffer
            .split_first_mut()
            .ok_or(FrameError::BufferTooSmall)?;
        *start = FRAME_START;
        let stuffed = stuff(&logical[..logical_len], rest)?;

        Ok(1 + stuffed)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_STUFFED_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_STUFFED_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Parse the escaped bytes that followed a START marker
    ///
    /// The input must hold exactly one frame. Nothing is returned unless the
    /// escaping, the declared length and the CRC are all valid.
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        let mut logical = [0u8; MAX_FRAME_SIZE];
        let logical_len = unstuff(raw, &mut logical).map_err(|e| match e {
            FrameError::BufferTooSmall => FrameError::LengthMismatch,
            other => other,
        })?;

        if logical_len < MIN_FRAME_SIZE {
            return Err(FrameError::TooShort);
        }

        let length = logical[0] as usize;
        if length > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        if logical_len != HEADER_SIZE + length + CRC_SIZE {
            return Err(FrameError::LengthMismatch);
        }

        let crc_offset = HEADER_SIZE + length;
        let received = u16::from_be_bytes([logical[crc_offset], logical[crc_offset + 1]]);
        if !crc::verify(&logical[..crc_offset], received) {
            return Err(FrameError::InvalidCrc);
        }

        Self::new(logical[1], logical[2], &logical[HEADER_SIZE..crc_offset])
    }
}

/// Escape `src` into `dst`, returning the number of bytes written
pub fn stuff(src: &[u8], dst: &mut [u8]) -> Result<usize, FrameError> {
    let mut written = 0;
    for &byte in src {
        if byte == FRAME_START || byte == ESCAPE {
            if written + 2 > dst.len() {
                return Err(FrameError::BufferTooSmall);
            }
            dst[written] = ESCAPE;
            dst[written + 1] = byte ^ ESCAPE_MASK;
            written += 2;
        } else {
            if written + 1 > dst.len() {
                return Err(FrameError::BufferTooSmall);
            }
            dst[written] = byte;
            written += 1;
        }
    }
    Ok(written)
}

/// Reverse [`stuff`], returning the number of bytes written to `dst`
pub fn unstuff(src: &[u8], dst: &mut [u8]) -> Result<usize, FrameError> {
    let mut written = 0;
    let mut bytes = src.iter();

    while let Some(&byte) = bytes.next() {
        let byte = if byte == ESCAPE {
            let next = *bytes.next().ok_or(FrameError::TruncatedEscape)?;
            let original = next ^ ESCAPE_MASK;
            if original != FRAME_START && original != ESCAPE {
                return Err(FrameError::InvalidEscape);
            }
            original
        } else {
            byte
        };

        let slot = dst.get_mut(written).ok_or(FrameError::BufferTooSmall)?;
        *slot = byte;
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_encode_empty_payload() {
        let frame = Frame::empty(0x00, 0x22); // GET_STATUS
        let encoded = frame.encode_to_vec().unwrap();

        assert_eq!(encoded.len(), 6);
        assert_eq!(encoded[0], FRAME_START);
        assert_eq!(encoded[1], 0); // length
        assert_eq!(encoded[2], 0); // seq
        assert_eq!(encoded[3], 0x22); // cmd
        let crc = crc::crc16(&[0x00, 0x00, 0x22]);
        assert_eq!(&encoded[4..6], &crc.to_be_bytes());
    }

    #[test]
    fn test_frame_encode_set_speed() {
        let frame = Frame::new(7, 0x11, &[0x04, 0xB0]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        assert_eq!(encoded[0], FRAME_START);
        assert_eq!(encoded[1], 2); // length
        assert_eq!(encoded[2], 7); // seq
        assert_eq!(encoded[3], 0x11); // cmd
        assert_eq!(&encoded[4..6], &[0x04, 0xB0]);
    }

    #[test]
    fn test_frame_roundtrip() {
        let original = Frame::new(42, 0x14, &[0x01, 0x02]).unwrap();
        let encoded = original.encode_to_vec().unwrap();

        let parsed = Frame::parse(&encoded[1..]).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_reserved_bytes_are_escaped() {
        // seq = START, payload holds both reserved bytes
        let frame = Frame::new(FRAME_START, 0x13, &[ESCAPE, FRAME_START]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        assert!(!encoded[1..].contains(&FRAME_START));
        assert_eq!(&encoded[2..4], &[ESCAPE, FRAME_START ^ ESCAPE_MASK]);
        assert_eq!(Frame::parse(&encoded[1..]).unwrap(), frame);
    }

    #[test]
    fn test_parse_invalid_crc() {
        let frame = Frame::new(1, 0x11, &[0x00, 0x64]).unwrap();
        let mut encoded = frame.encode_to_vec().unwrap();
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0x01;

        assert_eq!(Frame::parse(&encoded[1..]), Err(FrameError::InvalidCrc));
    }

    #[test]
    fn test_parse_truncated_escape() {
        assert_eq!(
            Frame::parse(&[0x00, 0x01, 0x22, 0x10, ESCAPE]),
            Err(FrameError::TruncatedEscape)
        );
    }

    #[test]
    fn test_parse_invalid_escape() {
        // 0x7D 0x41 would unescape to 0x61, which never needs escaping
        assert_eq!(
            Frame::parse(&[0x00, 0x01, ESCAPE, 0x41, 0x10, 0x20]),
            Err(FrameError::InvalidEscape)
        );
    }

    #[test]
    fn test_parse_length_mismatch() {
        let frame = Frame::new(3, 0x12, &[0x00, 0x32]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();
        // Drop one payload byte: declared length no longer matches
        let mut short = heapless::Vec::<u8, 16>::new();
        short.extend_from_slice(&encoded[1..4]).unwrap();
        short.extend_from_slice(&encoded[5..]).unwrap();

        assert_eq!(Frame::parse(&short), Err(FrameError::LengthMismatch));
    }

    #[test]
    fn test_parse_too_short() {
        assert_eq!(Frame::parse(&[0x00, 0x01, 0x22]), Err(FrameError::TooShort));
    }

    #[test]
    fn test_with_length_checks_declared_length() {
        assert_eq!(
            Frame::with_length(3, 0, 0x11, &[0x04, 0xB0]),
            Err(FrameError::LengthMismatch)
        );
        assert_eq!(
            Frame::with_length(251, 0, 0x11, &[0x00]),
            Err(FrameError::PayloadTooLarge)
        );
        assert!(Frame::with_length(2, 0, 0x11, &[0x04, 0xB0]).is_ok());
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let result = Frame::new(0, 0x11, &large_payload);
        assert_eq!(result, Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let frame = Frame::new(0, 0x11, &[0x04, 0xB0]).unwrap();
        let mut buffer = [0u8; 4];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
        assert_eq!(frame.encode(&mut []), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_max_payload_all_reserved_fits() {
        let payload = [FRAME_START; MAX_PAYLOAD_SIZE];
        let frame = Frame::new(FRAME_START, ESCAPE, &payload).unwrap();
        let encoded = frame.encode_to_vec().unwrap();
        assert!(encoded.len() <= MAX_STUFFED_SIZE);
        assert_eq!(Frame::parse(&encoded[1..]).unwrap(), frame);
    }
}
