//! Machine-room side of the link
//!
//! [`Slave`] combines the dispatcher with the link watchdog. Every valid
//! frame feeds the watchdog, whatever the command turns out to be. Losing
//! the console, or an emergency stop, puts the machine in its safe state;
//! the next valid frame takes it out again.

pub mod dispatcher;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod testing;

use cmlink_protocol::{Command, Frame, FrameError, Timestamp};

use crate::config::LinkConfig;
use crate::traits::MachineRoom;

pub use dispatcher::{dispatch, Limits, Outcome, Reply};
pub use watchdog::{LinkWatchdog, WatchdogEvent};

/// Machine-room link state
pub struct Slave<M> {
    machine: M,
    limits: Limits,
    watchdog: LinkWatchdog,
    safe_state: bool,
}

impl<M: MachineRoom> Slave<M> {
    pub fn new(machine: M, config: &LinkConfig, now: Timestamp) -> Self {
        Self {
            machine,
            limits: Limits::from(config),
            watchdog: LinkWatchdog::new(config, now),
            safe_state: false,
        }
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Whether outputs are held in the safe state
    pub fn in_safe_state(&self) -> bool {
        self.safe_state
    }

    /// Handle a frame extracted by the receiver and build the reply
    pub fn on_frame(&mut self, frame: &Frame, now: Timestamp) -> Result<Reply, FrameError> {
        self.watchdog.feed(now);
        if self.safe_state {
            self.safe_state = false;
            self.machine.leave_safe_state();
        }

        let reply = dispatch(frame, &mut self.machine, &self.limits)?;
        if reply.outcome == Outcome::Applied(Command::EmergencyStop) {
            self.safe_state = true;
        }
        Ok(reply)
    }

    /// Check the watchdog; call on the watchdog period
    ///
    /// On a trip the machine enters the safe state, once per silent episode.
    pub fn tick(&mut self, now: Timestamp) -> Option<WatchdogEvent> {
        let event = self.watchdog.check(now)?;
        if !self.safe_state {
            self.machine.enter_safe_state();
            self.safe_state = true;
        }
        Some(event)
    }
}
