//! Machine-room actuators and sensors
//!
//! The control loops behind these calls (drive ramp, incline positioning,
//! belt-speed measurement) belong to the board. The dispatcher only reads
//! their state and hands them new targets.

use cmlink_protocol::{FanId, FanLevel, Incline, RelayState, Speed, StatusFlags};

/// Variable-frequency drive state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VfdStatus {
    /// Drive not answering
    #[default]
    Disconnected,
    /// Drive ready
    Ok,
    /// Drive reported a fault
    Fault,
}

/// Everything the machine room exposes to the link
pub trait MachineRoom {
    /// Current drive state
    fn vfd_status(&self) -> VfdStatus;

    /// Set the belt speed target
    fn set_speed(&mut self, speed: Speed);

    /// Measured belt speed
    fn sensed_speed(&self) -> Speed;

    /// Whether the incline has found its reference position
    fn incline_homed(&self) -> bool;

    /// Set the incline target
    ///
    /// Only called once the incline is homed.
    fn set_incline_target(&mut self, incline: Incline);

    /// Measured incline
    fn incline_position(&self) -> Incline;

    /// Start homing the incline; clears the homed flag until it completes
    fn start_homing(&mut self);

    fn set_fan(&mut self, fan: FanId, level: FanLevel);

    fn fan_level(&self, fan: FanId) -> FanLevel;

    /// Switch the wax pump
    ///
    /// `On` starts one timed run; `Off` cancels a run in progress.
    fn set_wax_pump(&mut self, state: RelayState);

    /// Stop the drive and incline, zero their targets, and switch every
    /// output off
    fn enter_safe_state(&mut self);

    /// Re-arm outputs after the safe state
    ///
    /// Targets stay at zero; the console sends new ones.
    fn leave_safe_state(&mut self) {}

    /// Fault bitmap reported to the console
    fn status_flags(&self) -> StatusFlags {
        let mut flags = StatusFlags::default();
        flags.set(StatusFlags::VFD_FAULT, self.vfd_status() != VfdStatus::Ok);
        flags
    }
}
