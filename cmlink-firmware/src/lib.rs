//! Board support shared by the console and machine-room binaries
//!
//! The link logic lives in `cmlink-core`; this crate owns the UART, the
//! shared-state locks and the embassy tasks that drive it.

#![no_std]

pub mod channels;
pub mod clock;
pub mod machine_io;
pub mod serial;
pub mod settings;
pub mod tasks;
