//! Monotonic time
//!
//! All deadlines on both nodes are expressed as a [`Timestamp`] taken from a
//! single monotonic millisecond clock, and compared with
//! [`Timestamp::millis_since`]. Firmware builds a timestamp from the
//! executor's clock; host tests construct them directly.

/// Point in time, in milliseconds since an arbitrary epoch (usually boot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch
    pub const ZERO: Self = Self(0);

    /// Create a timestamp from milliseconds since the epoch
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Milliseconds since the epoch
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`
    ///
    /// Saturates at zero if `earlier` is actually later.
    pub const fn millis_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// The timestamp `ms` milliseconds after this one
    pub const fn add_millis(self, ms: u32) -> Self {
        Self(self.0.saturating_add(ms as u64))
    }
}
