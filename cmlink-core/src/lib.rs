//! Board-agnostic link logic for the treadmill controllers
//!
//! This crate contains everything about the console ↔ machine-room link
//! that does not depend on a specific board:
//!
//! - Link configuration (timeouts, retry budget, value limits)
//! - Console side: pending-request table, retry sweep, connection
//!   liveness, heartbeat scheduling, cached machine-room state
//! - Machine-room side: command dispatch and the link watchdog
//! - The trait a machine-room board implements
//!
//! Nothing here performs I/O or reads a clock. Callers pass the current
//! [`Timestamp`](cmlink_protocol::Timestamp) in and transmit the frames that
//! come back out.

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod master;
pub mod slave;
pub mod traits;

pub use config::{ConfigError, LinkConfig};
pub use master::{HeartbeatStep, Inbound, Master, MasterError, SweepReport};
pub use slave::{Outcome, Reply, Slave, WatchdogEvent};
pub use traits::{MachineRoom, VfdStatus};
