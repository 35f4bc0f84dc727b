//! Link watchdog
//!
//! Trips when no valid frame has arrived for the watchdog timeout. It stays
//! quiet for a grace period after boot so the console has time to start,
//! and trips at most once per silent episode.

use cmlink_protocol::Timestamp;

use crate::config::LinkConfig;

/// Watchdog trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WatchdogEvent {
    /// Time since the last valid frame (or since boot)
    pub silent_ms: u64,
}

#[derive(Debug, Clone)]
pub struct LinkWatchdog {
    timeout_ms: u32,
    grace_ms: u32,
    started_at: Timestamp,
    last_frame_at: Option<Timestamp>,
    tripped: bool,
}

impl LinkWatchdog {
    pub fn new(config: &LinkConfig, now: Timestamp) -> Self {
        Self {
            timeout_ms: config.watchdog_timeout_ms,
            grace_ms: config.watchdog_grace_ms,
            started_at: now,
            last_frame_at: None,
            tripped: false,
        }
    }

    /// Record a valid frame
    ///
    /// Returns true if the watchdog had tripped.
    pub fn feed(&mut self, now: Timestamp) -> bool {
        self.last_frame_at = Some(now);
        core::mem::replace(&mut self.tripped, false)
    }

    /// Check the deadline
    pub fn check(&mut self, now: Timestamp) -> Option<WatchdogEvent> {
        if self.tripped || now.millis_since(self.started_at) < self.grace_ms as u64 {
            return None;
        }

        let silent_ms = now.millis_since(self.last_frame_at.unwrap_or(self.started_at));
        if silent_ms > self.timeout_ms as u64 {
            self.tripped = true;
            Some(WatchdogEvent { silent_ms })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_quiet_during_grace() {
        let mut watchdog = LinkWatchdog::new(&LinkConfig::default(), at(0));
        assert_eq!(watchdog.check(at(1900)), None);
        assert!(watchdog.check(at(2000)).is_some());
    }

    #[test]
    fn test_trips_once_per_episode() {
        let mut watchdog = LinkWatchdog::new(&LinkConfig::default(), at(0));
        watchdog.feed(at(2500));

        assert_eq!(watchdog.check(at(3200)), None);
        assert_eq!(
            watchdog.check(at(3300)),
            Some(WatchdogEvent { silent_ms: 800 })
        );
        assert_eq!(watchdog.check(at(3400)), None);

        assert!(watchdog.feed(at(3500)));
        assert!(!watchdog.feed(at(3600)));
    }
}
