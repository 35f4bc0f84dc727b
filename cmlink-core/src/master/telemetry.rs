//! Last known machine-room state

use cmlink_protocol::{FanLevel, Incline, Response, Speed, StatusFlags, Timestamp};

/// Values reported by the machine room
///
/// Values are kept across link loss; `updated_at` tells how old they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    pub sensed_speed: Speed,
    pub incline_position: Incline,
    pub status: StatusFlags,
    pub head_fan: FanLevel,
    pub chest_fan: FanLevel,
    pub updated_at: Option<Timestamp>,
}

impl Telemetry {
    /// Fold a typed response into the cache
    ///
    /// Returns false for ACK/NAK, which carry no telemetry.
    pub fn apply(&mut self, response: &Response, now: Timestamp) -> bool {
        match *response {
            Response::SensorSpeed(speed) => self.sensed_speed = speed,
            Response::InclinePosition(incline) => self.incline_position = incline,
            Response::Status(flags) => self.status = flags,
            Response::FanState { head, chest } => {
                self.head_fan = head;
                self.chest_fan = chest;
            }
            Response::Ack { .. } | Response::Nak { .. } => return false,
        }
        self.updated_at = Some(now);
        true
    }
}
