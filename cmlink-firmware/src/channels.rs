//! Inter-task communication
//!
//! Shared link state sits behind async mutexes that are always locked with a
//! bounded wait. Machine-room actuators are driven through signals and
//! report back through atomics.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU16};

use cmlink_core::{Master, Slave};
use cmlink_protocol::{Incline, RelayState};

use crate::machine_io::MachineIo;

/// Console link state: pending table, targets and cached telemetry
pub type SharedMaster = Mutex<CriticalSectionRawMutex, Master>;

/// Machine-room link state: dispatcher, watchdog and outputs
pub type SharedSlave = Mutex<CriticalSectionRawMutex, Slave<MachineIo>>;

/// Incline motor command
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum InclineCommand {
    /// Drive to the lower limit and zero the position
    Home,
    /// Drive to a position
    MoveTo(Incline),
    /// Stop where it is
    Stop,
}

/// Incline motor command (updated by the dispatcher)
pub static INCLINE_CMD: Signal<CriticalSectionRawMutex, InclineCommand> = Signal::new();

/// Wax pump request (updated by the dispatcher)
pub static WAX_PUMP: Signal<CriticalSectionRawMutex, RelayState> = Signal::new();

/// Belt speed from the pulse sensor, km/h x 100
pub static SENSED_SPEED: AtomicU16 = AtomicU16::new(0);

/// Incline position estimate, % x 10
pub static INCLINE_POSITION: AtomicU16 = AtomicU16::new(0);

/// Set once the incline has found its lower limit
pub static INCLINE_HOMED: AtomicBool = AtomicBool::new(false);
