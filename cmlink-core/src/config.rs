//! Link configuration
//!
//! Every timing constant of the link lives in [`LinkConfig`]. The defaults
//! are the values the machine was commissioned with; a board may override
//! them from a stored blob (postcard, behind the `serde` feature).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use cmlink_protocol::{Incline, Speed};

/// Magic number to identify a stored link configuration
pub const CONFIG_MAGIC: u32 = 0x434D_4C4B; // "CMLK"

/// Current stored configuration version
pub const CONFIG_VERSION: u8 = 1;

/// Largest serialized configuration blob
pub const MAX_CONFIG_SIZE: usize = 96;

/// Polls issued per heartbeat round
const POLLS_PER_ROUND: u32 = 4;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Request timeout is zero
    RequestTimeout,
    /// Sweep period is zero or not shorter than the request timeout
    SweepPeriod,
    /// Connection timeout does not exceed the request timeout
    ConnectionTimeout,
    /// Heartbeat period is zero or too long to keep the link alive
    HeartbeatPeriod,
    /// A full poll round does not fit in one heartbeat period
    PollSpacing,
    /// Lock timeout is zero
    LockTimeout,
    /// Inter-byte timeout is zero
    InterByteTimeout,
    /// Watchdog timeout or check period is zero, or the period is too long
    Watchdog,
    /// Speed or incline limit is zero
    Limits,
    /// Stored blob could not be serialized
    Serialize,
    /// Stored blob could not be deserialized
    Deserialize,
    /// Stored blob has the wrong magic or version
    InvalidFormat,
}

/// Timing and limit settings shared by both nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Time to wait for a response before retransmitting
    pub request_timeout_ms: u32,
    /// Retransmissions before a request is abandoned
    pub max_retries: u8,
    /// Period of the timeout/retry sweep
    pub sweep_period_ms: u32,
    /// Silence after which the console marks the link down
    pub connection_timeout_ms: u32,
    /// Period of the console heartbeat
    pub heartbeat_period_ms: u32,
    /// Gap between consecutive polls of one heartbeat round
    pub poll_spacing_ms: u32,
    /// Longest wait for a shared-state lock
    pub lock_timeout_ms: u32,
    /// Longest gap between two bytes of one frame
    pub inter_byte_timeout_ms: u32,
    /// Silence after which the machine room enters the safe state
    pub watchdog_timeout_ms: u32,
    /// Period of the machine-room watchdog check
    pub watchdog_period_ms: u32,
    /// Time after boot before the watchdog is armed
    pub watchdog_grace_ms: u32,
    /// Run time of the wax pump per request
    pub wax_pump_run_ms: u32,
    /// Speed limit (km/h × 100)
    pub max_speed_centi_kmh: u16,
    /// Incline limit (% × 10)
    pub max_incline_deci_percent: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 100,
            max_retries: 3,
            sweep_period_ms: 50,
            connection_timeout_ms: 1000,
            heartbeat_period_ms: 300,
            poll_spacing_ms: 10,
            lock_timeout_ms: 10,
            inter_byte_timeout_ms: 100,
            watchdog_timeout_ms: 700,
            watchdog_period_ms: 100,
            watchdog_grace_ms: 2000,
            wax_pump_run_ms: 5000,
            max_speed_centi_kmh: 1950,
            max_incline_deci_percent: 150,
        }
    }
}

impl LinkConfig {
    /// Speed limit
    pub fn max_speed(&self) -> Speed {
        Speed::from_centi_kmh(self.max_speed_centi_kmh)
    }

    /// Incline limit
    pub fn max_incline(&self) -> Incline {
        Incline::from_deci_percent(self.max_incline_deci_percent)
    }

    /// Check that the settings can work together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::RequestTimeout);
        }
        // A sweep slower than the timeout would let entries age unchecked
        if self.sweep_period_ms == 0 || self.sweep_period_ms >= self.request_timeout_ms {
            return Err(ConfigError::SweepPeriod);
        }
        if self.connection_timeout_ms <= self.request_timeout_ms {
            return Err(ConfigError::ConnectionTimeout);
        }
        if self.heartbeat_period_ms == 0
            || self.heartbeat_period_ms >= self.connection_timeout_ms
        {
            return Err(ConfigError::HeartbeatPeriod);
        }
        if self.poll_spacing_ms.saturating_mul(POLLS_PER_ROUND) >= self.heartbeat_period_ms {
            return Err(ConfigError::PollSpacing);
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::LockTimeout);
        }
        if self.inter_byte_timeout_ms == 0 {
            return Err(ConfigError::InterByteTimeout);
        }
        if self.watchdog_timeout_ms == 0
            || self.watchdog_period_ms == 0
            || self.watchdog_period_ms >= self.watchdog_timeout_ms
        {
            return Err(ConfigError::Watchdog);
        }
        if self.max_speed_centi_kmh == 0 || self.max_incline_deci_percent == 0 {
            return Err(ConfigError::Limits);
        }
        Ok(())
    }
}

/// Stored form of [`LinkConfig`]
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct StoredConfig {
    magic: u32,
    version: u8,
    config: LinkConfig,
}

#[cfg(feature = "serde")]
impl LinkConfig {
    /// Serialize into `buffer`, returning the used part
    pub fn to_bytes<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        let stored = StoredConfig {
            magic: CONFIG_MAGIC,
            version: CONFIG_VERSION,
            config: *self,
        };
        postcard::to_slice(&stored, buffer).map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize and validate a stored blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let stored: StoredConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        if stored.magic != CONFIG_MAGIC || stored.version != CONFIG_VERSION {
            return Err(ConfigError::InvalidFormat);
        }
        stored.config.validate()?;
        Ok(stored.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LinkConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.max_speed().centi_kmh(), 1950);
        assert_eq!(config.max_incline().deci_percent(), 150);
    }

    #[test]
    fn test_sweep_must_be_faster_than_timeout() {
        let config = LinkConfig {
            sweep_period_ms: 100,
            ..LinkConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SweepPeriod));
    }

    #[test]
    fn test_poll_round_must_fit_heartbeat() {
        let config = LinkConfig {
            poll_spacing_ms: 80,
            ..LinkConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PollSpacing));

        let config = LinkConfig {
            poll_spacing_ms: u32::MAX,
            ..LinkConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PollSpacing));
    }

    #[test]
    fn test_watchdog_checks() {
        let config = LinkConfig {
            watchdog_period_ms: 700,
            ..LinkConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Watchdog));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = LinkConfig {
            max_speed_centi_kmh: 0,
            ..LinkConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Limits));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_stored_roundtrip() {
        let config = LinkConfig {
            heartbeat_period_ms: 250,
            ..LinkConfig::default()
        };
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let bytes = config.to_bytes(&mut buffer).unwrap();
        assert_eq!(LinkConfig::from_bytes(bytes), Ok(config));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_stored_wrong_magic() {
        let stored = StoredConfig {
            magic: 0,
            version: CONFIG_VERSION,
            config: LinkConfig::default(),
        };
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let bytes = postcard::to_slice(&stored, &mut buffer).unwrap();
        assert_eq!(
            LinkConfig::from_bytes(bytes),
            Err(ConfigError::InvalidFormat)
        );
    }
}
