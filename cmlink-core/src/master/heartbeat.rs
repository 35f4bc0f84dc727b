//! Heartbeat scheduling
//!
//! Each heartbeat the console either sends one "set" command or a round of
//! polls. A [`SetChannel`] tracks one kind of set command so that at most one
//! of that kind is ever in flight, however fast the operator changes the
//! target.

use cmlink_protocol::{Command, Frame};

/// Polls issued when nothing else is going on
pub static POLL_ROUND: [Command; 4] = [
    Command::GetStatus,
    Command::GetSensorSpeed,
    Command::GetInclinePosition,
    Command::GetFanState,
];

/// Poll issued while a set command is awaiting its ACK
pub static STATUS_ONLY: [Command; 1] = [Command::GetStatus];

/// What the heartbeat decided to do
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeartbeatStep {
    /// A set command was queued; transmit this frame and end the cycle
    Set(Frame),
    /// Issue these polls, spaced apart
    Poll(&'static [Command]),
}

/// Target tracking for one kind of set command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetChannel<T> {
    target: T,
    last_sent: Option<T>,
    in_flight: Option<(u8, T)>,
    acknowledged: Option<T>,
}

impl<T: Copy + PartialEq> SetChannel<T> {
    /// Create a channel whose initial target is already in effect
    pub const fn new(target: T) -> Self {
        Self {
            target,
            last_sent: Some(target),
            in_flight: None,
            acknowledged: None,
        }
    }

    pub fn target(&self) -> T {
        self.target
    }

    pub fn set_target(&mut self, target: T) {
        self.target = target;
    }

    /// Last value the peer acknowledged
    pub fn acknowledged(&self) -> Option<T> {
        self.acknowledged
    }

    /// Whether a command of this kind is awaiting its ACK
    pub fn is_waiting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the target should be sent now
    pub fn wants_send(&self) -> bool {
        self.in_flight.is_none() && self.last_sent != Some(self.target)
    }

    /// Record that the target went out with sequence number `seq`
    pub fn sent(&mut self, seq: u8) {
        self.last_sent = Some(self.target);
        self.in_flight = Some((seq, self.target));
    }

    fn release(&mut self, seq: u8) -> Option<T> {
        match self.in_flight {
            Some((waiting, value)) if waiting == seq => {
                self.in_flight = None;
                Some(value)
            }
            _ => None,
        }
    }

    /// Peer accepted the command with sequence number `seq`
    ///
    /// Returns false if `seq` is not this channel's command.
    pub fn acked(&mut self, seq: u8) -> bool {
        match self.release(seq) {
            Some(value) => {
                self.acknowledged = Some(value);
                true
            }
            None => false,
        }
    }

    /// Peer rejected the command with sequence number `seq`
    ///
    /// The rejected value stays recorded as sent, so it is not repeated
    /// until the target changes.
    pub fn rejected(&mut self, seq: u8) -> bool {
        self.release(seq).is_some()
    }

    /// Command with sequence number `seq` ran out of retries
    ///
    /// The value is forgotten so the next heartbeat sends it again.
    pub fn abandoned(&mut self, seq: u8) -> bool {
        if self.release(seq).is_some() {
            self.last_sent = None;
            true
        } else {
            false
        }
    }
}
