//! Console side of the link
//!
//! [`Master`] owns the outbound sequence counter, the pending table, the
//! connection flag and the cached machine-room state. It never touches the
//! serial port: every operation returns the frames to transmit, and the
//! calling task sends them after releasing whatever lock guards the master.
//!
//! Three entry points drive it:
//! - [`Master::handle_frame`] for every frame the receiver extracts
//! - [`Master::sweep`] on the retry period
//! - [`Master::heartbeat`] on the heartbeat period

pub mod heartbeat;
pub mod liveness;
pub mod pending;
pub mod telemetry;

use heapless::Vec;

use cmlink_protocol::{
    Command, FanLevel, Frame, FrameError, Incline, NakCode, RelayState, Response, Speed,
    StatusFlags, Timestamp,
};

use crate::config::LinkConfig;

pub use heartbeat::{HeartbeatStep, SetChannel, POLL_ROUND, STATUS_ONLY};
pub use liveness::Liveness;
pub use pending::{PendingEntry, PendingTable, MAX_PENDING};
pub use telemetry::Telemetry;

/// Errors returned to callers queueing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MasterError {
    /// Pending table is full; the command was dropped
    PendingFull,
    /// Command not allowed from the console or argument out of range
    InvalidArgument,
    /// Command could not be encoded
    Frame(FrameError),
}

impl From<FrameError> for MasterError {
    fn from(e: FrameError) -> Self {
        MasterError::Frame(e)
    }
}

/// What an inbound frame turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Inbound {
    /// Pending request `seq` (opcode `cmd`) was accepted
    Acked { seq: u8, cmd: u8 },
    /// Pending request `seq` (opcode `cmd`) was rejected
    Rejected { seq: u8, cmd: u8, code: NakCode },
    /// Typed response to a pending poll, folded into the telemetry cache
    Data(Response),
    /// No pending request has this sequence number
    Unmatched { seq: u8 },
    /// Typed data that does not answer the pending request with this sequence
    Unexpected { seq: u8 },
    /// Frame is not a valid response
    Malformed(FrameError),
}

/// Request abandoned by the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Abandoned {
    pub seq: u8,
    pub cmd: u8,
}

/// Outcome of one retry sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Frames to transmit again, unchanged
    pub retransmit: Vec<Frame, MAX_PENDING>,
    /// Requests that ran out of retries
    pub abandoned: Vec<Abandoned, MAX_PENDING>,
    /// The link went down during this sweep
    pub link_lost: bool,
}

/// Console link state
#[derive(Debug, Clone)]
pub struct Master {
    config: LinkConfig,
    next_seq: u8,
    pending: PendingTable,
    liveness: Liveness,
    speed: SetChannel<Speed>,
    incline: SetChannel<Incline>,
    telemetry: Telemetry,
}

impl Master {
    pub fn new(config: LinkConfig) -> Self {
        Self::with_first_sequence(config, 0)
    }

    /// Create a master whose first request uses sequence number `seq`
    pub fn with_first_sequence(config: LinkConfig, seq: u8) -> Self {
        Self {
            config,
            next_seq: seq,
            pending: PendingTable::new(),
            liveness: Liveness::new(),
            speed: SetChannel::new(Speed::ZERO),
            incline: SetChannel::new(Incline::ZERO),
            telemetry: Telemetry::default(),
        }
    }

    /// Set the belt speed target, clamped to the limit
    ///
    /// The heartbeat sends it. Returns the stored target.
    pub fn set_target_speed(&mut self, speed: Speed) -> Speed {
        let speed = speed.min(self.config.max_speed());
        self.speed.set_target(speed);
        speed
    }

    /// Set the incline target, clamped to the limit
    pub fn set_target_incline(&mut self, incline: Incline) -> Incline {
        let incline = incline.min(self.config.max_incline());
        self.incline.set_target(incline);
        incline
    }

    pub fn target_speed(&self) -> Speed {
        self.speed.target()
    }

    pub fn target_incline(&self) -> Incline {
        self.incline.target()
    }

    /// Last speed target the machine room acknowledged
    pub fn acknowledged_speed(&self) -> Option<Speed> {
        self.speed.acknowledged()
    }

    /// Last incline target the machine room acknowledged
    pub fn acknowledged_incline(&self) -> Option<Incline> {
        self.incline.acknowledged()
    }

    pub fn is_connected(&self) -> bool {
        self.liveness.is_connected()
    }

    pub fn last_response_at(&self) -> Option<Timestamp> {
        self.liveness.last_response_at()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn sensed_speed(&self) -> Speed {
        self.telemetry.sensed_speed
    }

    pub fn incline_position(&self) -> Incline {
        self.telemetry.incline_position
    }

    pub fn status(&self) -> StatusFlags {
        self.telemetry.status
    }

    pub fn fan_levels(&self) -> (FanLevel, FanLevel) {
        (self.telemetry.head_fan, self.telemetry.chest_fan)
    }

    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// Queue an operator action or a poll
    ///
    /// Speed and incline go through the targets instead, so the heartbeat
    /// can keep one of each in flight. The wax pump is timed by the machine
    /// room and can only be switched on from here.
    ///
    /// Returns the frame to transmit.
    pub fn send(&mut self, command: Command, now: Timestamp) -> Result<Frame, MasterError> {
        match command {
            Command::SetSpeed(_) | Command::SetIncline(_) => Err(MasterError::InvalidArgument),
            Command::SetRelay {
                state: RelayState::Off,
                ..
            } => Err(MasterError::InvalidArgument),
            _ => self.transmit(command, now),
        }
    }

    /// Assign a sequence number and record the request as pending
    fn transmit(&mut self, command: Command, now: Timestamp) -> Result<Frame, MasterError> {
        if self.pending.is_full() {
            return Err(MasterError::PendingFull);
        }

        let seq = self.allocate_sequence();
        let frame = command.to_frame(seq)?;
        self.pending
            .insert(PendingEntry::new(frame.clone(), now, command.expects_ack()))
            .map_err(|_| MasterError::PendingFull)?;
        Ok(frame)
    }

    /// Next sequence number not held by a pending request
    fn allocate_sequence(&mut self) -> u8 {
        loop {
            let seq = self.next_seq;
            self.next_seq = self.next_seq.wrapping_add(1);
            // The table holds fewer than 256 entries, so this terminates
            if !self.pending.contains(seq) {
                return seq;
            }
        }
    }

    /// Run one heartbeat cycle
    ///
    /// A changed incline target goes first, then a changed speed target. If
    /// neither needs sending, the polls to issue are returned: only the
    /// status while a set command awaits its ACK, otherwise the full round.
    pub fn heartbeat(&mut self, now: Timestamp) -> Result<HeartbeatStep, MasterError> {
        if self.incline.wants_send() {
            let frame = self.transmit(Command::SetIncline(self.incline.target()), now)?;
            self.incline.sent(frame.seq);
            return Ok(HeartbeatStep::Set(frame));
        }

        if self.speed.wants_send() {
            let frame = self.transmit(Command::SetSpeed(self.speed.target()), now)?;
            self.speed.sent(frame.seq);
            return Ok(HeartbeatStep::Set(frame));
        }

        if self.speed.is_waiting() || self.incline.is_waiting() {
            Ok(HeartbeatStep::Poll(&STATUS_ONLY))
        } else {
            Ok(HeartbeatStep::Poll(&POLL_ROUND))
        }
    }

    /// Handle a frame extracted by the receiver
    ///
    /// Any valid frame proves the link is alive, even one that matches no
    /// pending request. Unmatched and unexpected frames change nothing else.
    pub fn handle_frame(&mut self, frame: &Frame, now: Timestamp) -> Inbound {
        self.liveness.on_frame(now);

        let response = match Response::from_frame(frame) {
            Ok(response) => response,
            Err(e) => return Inbound::Malformed(e),
        };

        let seq = response.request_seq(frame);
        let Some(entry) = self.pending.get(seq) else {
            return Inbound::Unmatched { seq };
        };
        if !answers(entry, &response) {
            return Inbound::Unexpected { seq };
        }

        let cmd = entry.frame.cmd;
        self.pending.take(seq);

        match response {
            Response::Ack { .. } => {
                let _ = self.speed.acked(seq) || self.incline.acked(seq);
                Inbound::Acked { seq, cmd }
            }
            Response::Nak { code, .. } => {
                let _ = self.speed.rejected(seq) || self.incline.rejected(seq);
                Inbound::Rejected { seq, cmd, code }
            }
            data => {
                self.telemetry.apply(&data, now);
                Inbound::Data(data)
            }
        }
    }

    /// Run one retry sweep
    ///
    /// Expired requests with retries left come back for retransmission.
    /// Requests out of retries are dropped and take the link down, as does
    /// silence longer than the connection timeout.
    pub fn sweep(&mut self, now: Timestamp) -> SweepReport {
        let expiry = self.pending.expire(
            now,
            self.config.request_timeout_ms,
            self.config.max_retries,
        );

        let mut report = SweepReport {
            retransmit: expiry.retransmit,
            ..SweepReport::default()
        };

        for entry in &expiry.abandoned {
            let seq = entry.seq();
            let _ = self.speed.abandoned(seq) || self.incline.abandoned(seq);
            let _ = report.abandoned.push(Abandoned {
                seq,
                cmd: entry.frame.cmd,
            });
        }

        if !expiry.abandoned.is_empty() && self.liveness.mark_down() {
            report.link_lost = true;
        }
        if self
            .liveness
            .check(now, self.config.connection_timeout_ms)
        {
            report.link_lost = true;
        }

        report
    }
}

/// Whether `response` may retire the pending request
///
/// ACK and NAK retire any request with their sequence number. Typed data
/// must be the response the poll asks for.
fn answers(entry: &PendingEntry, response: &Response) -> bool {
    match response {
        Response::Ack { .. } | Response::Nak { .. } => true,
        data => {
            !entry.awaits_ack
                && Command::from_frame(&entry.frame)
                    .ok()
                    .and_then(|command| command.response_opcode())
                    == Some(data.opcode())
        }
    }
}
