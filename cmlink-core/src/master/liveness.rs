//! Connection liveness
//!
//! The link is up from the first valid inbound frame until either the peer
//! stays silent for the connection timeout or a request runs out of retries.

use cmlink_protocol::Timestamp;

/// Connection state as seen by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Liveness {
    connected: bool,
    last_response_at: Option<Timestamp>,
}

impl Liveness {
    pub const fn new() -> Self {
        Self {
            connected: false,
            last_response_at: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Time of the last valid inbound frame
    pub fn last_response_at(&self) -> Option<Timestamp> {
        self.last_response_at
    }

    /// Record a valid inbound frame
    ///
    /// Returns true if this brought the link up.
    pub fn on_frame(&mut self, now: Timestamp) -> bool {
        self.last_response_at = Some(now);
        let was_connected = self.connected;
        self.connected = true;
        !was_connected
    }

    /// Mark the link down
    ///
    /// Returns true if the link was up.
    pub fn mark_down(&mut self) -> bool {
        let was_connected = self.connected;
        self.connected = false;
        was_connected
    }

    /// Mark the link down if the peer has been silent too long
    ///
    /// Returns true if this took the link down.
    pub fn check(&mut self, now: Timestamp, timeout_ms: u32) -> bool {
        let silent = match self.last_response_at {
            Some(at) => now.millis_since(at) > timeout_ms as u64,
            None => false,
        };
        silent && self.mark_down()
    }
}
