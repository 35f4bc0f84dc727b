//! Console ↔ Machine-Room Serial Protocol
//!
//! This crate defines the framed binary protocol spoken over the half-duplex
//! serial link between the console (master) and the machine room (slave).
//!
//! # Protocol Overview
//!
//! Every frame starts with a marker byte, followed by the escaped logical
//! frame:
//! ```text
//! ┌────────┬─────────────────────────────────────────────────────────┐
//! │ MARKER │ escaped( LENGTH │ SEQ │ CMD │ PAYLOAD      │ CRC_H │ CRC_L ) │
//! │ 0x3A   │          1B     │ 1B  │ 1B  │ 0–250B       │ 1B    │ 1B    │
//! └────────┴─────────────────────────────────────────────────────────┘
//! ```
//!
//! The CRC is CRC-16/CCITT-FALSE over `LENGTH | SEQ | CMD | PAYLOAD`.
//! Inside the escaped region the marker (0x3A) and escape (0x7D) bytes never
//! appear literally; each is sent as `0x7D, byte ^ 0x20`.
//!
//! Requests carry a sequence number that the responder echoes, so responses
//! are matched to requests by sequence alone.

#![no_std]
#![deny(unsafe_code)]

pub mod crc;
pub mod frame;
pub mod messages;
pub mod receiver;
pub mod time;
pub mod units;

pub use crc::crc16;
pub use frame::{
    Frame, FrameError, ESCAPE, ESCAPE_MASK, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
    MAX_STUFFED_SIZE, MIN_FRAME_SIZE,
};
pub use messages::{Command, NakCode, Response, StatusFlags};
pub use receiver::{FrameReceiver, ReceiveState, ReceiverStats, INTER_BYTE_TIMEOUT_MS};
pub use time::Timestamp;
pub use units::{FanId, FanLevel, Incline, RelayId, RelayState, Speed};
