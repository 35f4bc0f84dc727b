//! Message types for the console ↔ machine-room link
//!
//! Message types are divided into two categories:
//! - Console → Machine room: set/action commands and polls
//! - Machine room → Console: ACK/NAK and typed poll responses
//!
//! Responders echo the request's sequence number in the frame header. ACK and
//! NAK also carry it as their first payload byte.

use crate::frame::{Frame, FrameError};
use crate::units::{FanId, FanLevel, Incline, RelayId, RelayState, Speed};

// Command IDs: Console → Machine room (set/action, answered by ACK/NAK)
pub const CMD_SET_SPEED: u8 = 0x11;
pub const CMD_SET_INCLINE: u8 = 0x12;
pub const CMD_SET_RELAY: u8 = 0x13;
pub const CMD_SET_FAN_STATE: u8 = 0x14;
pub const CMD_CALIBRATE_INCLINE: u8 = 0x15;
pub const CMD_EMERGENCY_STOP: u8 = 0x1F;

// Command IDs: Console → Machine room (polls, answered by a typed response)
pub const CMD_GET_SENSOR_SPEED: u8 = 0x21;
pub const CMD_GET_STATUS: u8 = 0x22;
pub const CMD_GET_INCLINE_POSITION: u8 = 0x23;
pub const CMD_GET_FAN_STATE: u8 = 0x24;

// Response IDs: Machine room → Console
pub const CMD_ACK: u8 = 0x80;
pub const CMD_NAK: u8 = 0x81;
pub const RSP_SENSOR_SPEED: u8 = 0xA1;
pub const RSP_STATUS: u8 = 0xA2;
pub const RSP_INCLINE_POSITION: u8 = 0xA3;
pub const RSP_FAN_STATE: u8 = 0xA4;

// NAK error codes
const NAK_UNKNOWN_COMMAND: u8 = 0xE2;
const NAK_INVALID_PAYLOAD: u8 = 0xE3;
const NAK_BUSY: u8 = 0xE4;
const NAK_NOT_READY: u8 = 0xE5;
const NAK_VFD_FAULT: u8 = 0xE6;

/// Commands sent by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Set belt speed
    SetSpeed(Speed),
    /// Set incline target
    SetIncline(Incline),
    /// Switch a relay
    SetRelay { relay: RelayId, state: RelayState },
    /// Set a cooling fan level
    SetFan { fan: FanId, level: FanLevel },
    /// Re-home the incline motor
    CalibrateIncline,
    /// Stop everything and enter the safe state
    EmergencyStop,
    /// Poll the measured belt speed
    GetSensorSpeed,
    /// Poll the fault bitmap
    GetStatus,
    /// Poll the measured incline
    GetInclinePosition,
    /// Poll both fan levels
    GetFanState,
}

impl Command {
    /// Wire opcode of this command
    pub fn opcode(&self) -> u8 {
        match self {
            Command::SetSpeed(_) => CMD_SET_SPEED,
            Command::SetIncline(_) => CMD_SET_INCLINE,
            Command::SetRelay { .. } => CMD_SET_RELAY,
            Command::SetFan { .. } => CMD_SET_FAN_STATE,
            Command::CalibrateIncline => CMD_CALIBRATE_INCLINE,
            Command::EmergencyStop => CMD_EMERGENCY_STOP,
            Command::GetSensorSpeed => CMD_GET_SENSOR_SPEED,
            Command::GetStatus => CMD_GET_STATUS,
            Command::GetInclinePosition => CMD_GET_INCLINE_POSITION,
            Command::GetFanState => CMD_GET_FAN_STATE,
        }
    }

    /// Whether the command is answered by ACK/NAK rather than a typed response
    pub fn expects_ack(&self) -> bool {
        !matches!(
            self,
            Command::GetSensorSpeed
                | Command::GetStatus
                | Command::GetInclinePosition
                | Command::GetFanState
        )
    }

    /// Opcode of the typed response a poll is answered with
    pub fn response_opcode(&self) -> Option<u8> {
        match self {
            Command::GetSensorSpeed => Some(RSP_SENSOR_SPEED),
            Command::GetStatus => Some(RSP_STATUS),
            Command::GetInclinePosition => Some(RSP_INCLINE_POSITION),
            Command::GetFanState => Some(RSP_FAN_STATE),
            _ => None,
        }
    }

    /// Parse a command from a frame
    ///
    /// Identifiers and enumerated states are checked here; value limits that
    /// depend on the machine are left to the dispatcher.
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let payload = frame.payload.as_slice();
        match frame.cmd {
            CMD_SET_SPEED => Ok(Command::SetSpeed(Speed::from_be_bytes(word(payload)?))),
            CMD_SET_INCLINE => Ok(Command::SetIncline(Incline::from_be_bytes(word(
                payload,
            )?))),
            CMD_SET_RELAY => {
                let [id, state] = word(payload)?;
                Ok(Command::SetRelay {
                    relay: RelayId::from_byte(id).ok_or(FrameError::InvalidPayload)?,
                    state: RelayState::from_byte(state).ok_or(FrameError::InvalidPayload)?,
                })
            }
            CMD_SET_FAN_STATE => {
                let [id, level] = word(payload)?;
                Ok(Command::SetFan {
                    fan: FanId::from_byte(id).ok_or(FrameError::InvalidPayload)?,
                    level: FanLevel::from_byte(level).ok_or(FrameError::InvalidPayload)?,
                })
            }
            CMD_CALIBRATE_INCLINE => none(payload, Command::CalibrateIncline),
            CMD_EMERGENCY_STOP => none(payload, Command::EmergencyStop),
            CMD_GET_SENSOR_SPEED => none(payload, Command::GetSensorSpeed),
            CMD_GET_STATUS => none(payload, Command::GetStatus),
            CMD_GET_INCLINE_POSITION => none(payload, Command::GetInclinePosition),
            CMD_GET_FAN_STATE => none(payload, Command::GetFanState),
            _ => Err(FrameError::UnknownCommand),
        }
    }

    /// Encode this command into a frame with the given sequence number
    pub fn to_frame(&self, seq: u8) -> Result<Frame, FrameError> {
        let opcode = self.opcode();
        match self {
            Command::SetSpeed(speed) => Frame::new(seq, opcode, &speed.to_be_bytes()),
            Command::SetIncline(incline) => Frame::new(seq, opcode, &incline.to_be_bytes()),
            Command::SetRelay { relay, state } => {
                Frame::new(seq, opcode, &[relay.to_byte(), state.to_byte()])
            }
            Command::SetFan { fan, level } => {
                Frame::new(seq, opcode, &[fan.to_byte(), level.to_byte()])
            }
            _ => Ok(Frame::empty(seq, opcode)),
        }
    }
}

/// Error code carried by a NAK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NakCode {
    /// Opcode not recognized
    UnknownCommand,
    /// Wrong payload size or value out of range
    InvalidPayload,
    /// Responder cannot take the command right now
    Busy,
    /// Precondition missing (incline not homed)
    NotReady,
    /// Drive faulted or disconnected
    VfdFault,
    /// Code not known to this build
    Other(u8),
}

impl NakCode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            NAK_UNKNOWN_COMMAND => NakCode::UnknownCommand,
            NAK_INVALID_PAYLOAD => NakCode::InvalidPayload,
            NAK_BUSY => NakCode::Busy,
            NAK_NOT_READY => NakCode::NotReady,
            NAK_VFD_FAULT => NakCode::VfdFault,
            other => NakCode::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            NakCode::UnknownCommand => NAK_UNKNOWN_COMMAND,
            NakCode::InvalidPayload => NAK_INVALID_PAYLOAD,
            NakCode::Busy => NAK_BUSY,
            NakCode::NotReady => NAK_NOT_READY,
            NakCode::VfdFault => NAK_VFD_FAULT,
            NakCode::Other(code) => code,
        }
    }
}

impl From<FrameError> for NakCode {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::UnknownCommand => NakCode::UnknownCommand,
            _ => NakCode::InvalidPayload,
        }
    }
}

/// Machine-room fault bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags(u8);

impl StatusFlags {
    /// Drive faulted or not responding
    pub const VFD_FAULT: u8 = 0x01;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn set(&mut self, flag: u8, on: bool) {
        if on {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    pub fn vfd_fault(self) -> bool {
        self.0 & Self::VFD_FAULT != 0
    }
}

/// Responses sent by the machine room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Command accepted
    Ack { seq: u8 },
    /// Command rejected
    Nak { seq: u8, code: NakCode },
    /// Measured belt speed
    SensorSpeed(Speed),
    /// Fault bitmap
    Status(StatusFlags),
    /// Measured incline
    InclinePosition(Incline),
    /// Both fan levels
    FanState { head: FanLevel, chest: FanLevel },
}

impl Response {
    /// Wire opcode of this response
    pub fn opcode(&self) -> u8 {
        match self {
            Response::Ack { .. } => CMD_ACK,
            Response::Nak { .. } => CMD_NAK,
            Response::SensorSpeed(_) => RSP_SENSOR_SPEED,
            Response::Status(_) => RSP_STATUS,
            Response::InclinePosition(_) => RSP_INCLINE_POSITION,
            Response::FanState { .. } => RSP_FAN_STATE,
        }
    }

    /// Sequence number of the request this response answers
    ///
    /// ACK/NAK name it in their payload; typed responses echo it in the header.
    pub fn request_seq(&self, frame: &Frame) -> u8 {
        match self {
            Response::Ack { seq } | Response::Nak { seq, .. } => *seq,
            _ => frame.seq,
        }
    }

    /// Parse a response from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let payload = frame.payload.as_slice();
        match frame.cmd {
            CMD_ACK => match payload {
                [seq] => Ok(Response::Ack { seq: *seq }),
                _ => Err(FrameError::InvalidPayload),
            },
            CMD_NAK => {
                let [seq, code] = word(payload)?;
                Ok(Response::Nak {
                    seq,
                    code: NakCode::from_byte(code),
                })
            }
            RSP_SENSOR_SPEED => Ok(Response::SensorSpeed(Speed::from_be_bytes(word(payload)?))),
            RSP_STATUS => match payload {
                [bits] => Ok(Response::Status(StatusFlags::from_bits(*bits))),
                _ => Err(FrameError::InvalidPayload),
            },
            RSP_INCLINE_POSITION => Ok(Response::InclinePosition(Incline::from_be_bytes(word(
                payload,
            )?))),
            RSP_FAN_STATE => {
                let [head, chest] = word(payload)?;
                Ok(Response::FanState {
                    head: FanLevel::from_byte(head).ok_or(FrameError::InvalidPayload)?,
                    chest: FanLevel::from_byte(chest).ok_or(FrameError::InvalidPayload)?,
                })
            }
            _ => Err(FrameError::UnknownCommand),
        }
    }

    /// Encode this response into a frame carrying the request's sequence
    pub fn to_frame(&self, seq: u8) -> Result<Frame, FrameError> {
        let opcode = self.opcode();
        match self {
            Response::Ack { seq: acked } => Frame::new(seq, opcode, &[*acked]),
            Response::Nak { seq: nacked, code } => {
                Frame::new(seq, opcode, &[*nacked, code.to_byte()])
            }
            Response::SensorSpeed(speed) => Frame::new(seq, opcode, &speed.to_be_bytes()),
            Response::Status(flags) => Frame::new(seq, opcode, &[flags.bits()]),
            Response::InclinePosition(incline) => {
                Frame::new(seq, opcode, &incline.to_be_bytes())
            }
            Response::FanState { head, chest } => {
                Frame::new(seq, opcode, &[head.to_byte(), chest.to_byte()])
            }
        }
    }
}

/// Two-byte payload
fn word(payload: &[u8]) -> Result<[u8; 2], FrameError> {
    match payload {
        [a, b] => Ok([*a, *b]),
        _ => Err(FrameError::InvalidPayload),
    }
}

/// Payload-less command
fn none(payload: &[u8], command: Command) -> Result<Command, FrameError> {
    if payload.is_empty() {
        Ok(command)
    } else {
        Err(FrameError::InvalidPayload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_speed_frame() {
        let cmd = Command::SetSpeed(Speed::from_centi_kmh(1200));
        let frame = cmd.to_frame(7).unwrap();

        assert_eq!(frame.seq, 7);
        assert_eq!(frame.cmd, CMD_SET_SPEED);
        assert_eq!(frame.payload.as_slice(), &[0x04, 0xB0]);
        assert_eq!(Command::from_frame(&frame).unwrap(), cmd);
    }

    #[test]
    fn test_polls_expect_typed_response() {
        assert!(Command::SetIncline(Incline::ZERO).expects_ack());
        assert!(Command::EmergencyStop.expects_ack());
        assert!(!Command::GetStatus.expects_ack());
        assert_eq!(Command::GetFanState.response_opcode(), Some(RSP_FAN_STATE));
        assert_eq!(Command::CalibrateIncline.response_opcode(), None);
    }

    #[test]
    fn test_unknown_command() {
        let frame = Frame::empty(1, 0x42);
        assert_eq!(Command::from_frame(&frame), Err(FrameError::UnknownCommand));
        assert_eq!(
            NakCode::from(FrameError::UnknownCommand),
            NakCode::UnknownCommand
        );
    }

    #[test]
    fn test_wrong_payload_size() {
        let frame = Frame::new(1, CMD_SET_SPEED, &[0x04]).unwrap();
        assert_eq!(Command::from_frame(&frame), Err(FrameError::InvalidPayload));

        let frame = Frame::new(1, CMD_GET_STATUS, &[0x00]).unwrap();
        assert_eq!(Command::from_frame(&frame), Err(FrameError::InvalidPayload));
    }

    #[test]
    fn test_fan_and_relay_ids_checked() {
        let bad_fan = Frame::new(1, CMD_SET_FAN_STATE, &[0x03, 0x01]).unwrap();
        assert_eq!(Command::from_frame(&bad_fan), Err(FrameError::InvalidPayload));

        let bad_level = Frame::new(1, CMD_SET_FAN_STATE, &[0x01, 0x03]).unwrap();
        assert_eq!(
            Command::from_frame(&bad_level),
            Err(FrameError::InvalidPayload)
        );

        let relay = Frame::new(1, CMD_SET_RELAY, &[0x01, 0x01]).unwrap();
        assert_eq!(
            Command::from_frame(&relay).unwrap(),
            Command::SetRelay {
                relay: RelayId::WaxPump,
                state: RelayState::On
            }
        );
    }

    #[test]
    fn test_ack_echoes_sequence() {
        let frame = Response::Ack { seq: 7 }.to_frame(7).unwrap();
        assert_eq!(frame.cmd, CMD_ACK);
        assert_eq!(frame.payload.as_slice(), &[0x07]);

        let parsed = Response::from_frame(&frame).unwrap();
        assert_eq!(parsed, Response::Ack { seq: 7 });
        assert_eq!(parsed.request_seq(&frame), 7);
    }

    #[test]
    fn test_nak_codes() {
        let nak = Response::Nak {
            seq: 3,
            code: NakCode::NotReady,
        };
        let frame = nak.to_frame(3).unwrap();
        assert_eq!(frame.payload.as_slice(), &[0x03, 0xE5]);
        assert_eq!(Response::from_frame(&frame).unwrap(), nak);

        assert_eq!(NakCode::from_byte(0x99), NakCode::Other(0x99));
        assert_eq!(NakCode::Other(0x99).to_byte(), 0x99);
    }

    #[test]
    fn test_typed_response_uses_header_sequence() {
        let rsp = Response::FanState {
            head: FanLevel::Full,
            chest: FanLevel::Off,
        };
        let frame = rsp.to_frame(42).unwrap();
        assert_eq!(frame.payload.as_slice(), &[0x02, 0x00]);
        assert_eq!(rsp.request_seq(&frame), 42);
    }

    #[test]
    fn test_status_flags() {
        let mut flags = StatusFlags::default();
        assert!(!flags.vfd_fault());
        flags.set(StatusFlags::VFD_FAULT, true);
        assert_eq!(flags.bits(), 0x01);
        flags.set(StatusFlags::VFD_FAULT, false);
        assert_eq!(flags, StatusFlags::default());
    }
}
