//! Hardware abstraction traits
//!
//! These traits define the interface between the link logic and the
//! board that actually drives the treadmill.

pub mod machine;

pub use machine::{MachineRoom, VfdStatus};
