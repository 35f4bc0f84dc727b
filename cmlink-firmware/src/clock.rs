//! Link time from the embassy clock

use cmlink_protocol::Timestamp;
use embassy_time::{Duration, Instant};

/// Current time as a link timestamp
pub fn now() -> Timestamp {
    Timestamp::from_millis(Instant::now().as_millis())
}

pub fn millis(ms: u32) -> Duration {
    Duration::from_millis(ms as u64)
}
