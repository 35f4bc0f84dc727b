//! Payload value types
//!
//! Fixed-point quantities travel as big-endian `u16`:
//! - speed in km/h × 100 (1200 = 12.00 km/h)
//! - incline in percent × 10 (55 = 5.5 %)

/// Belt speed in hundredths of a km/h
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Speed(u16);

impl Speed {
    pub const ZERO: Self = Self(0);

    /// Create from hundredths of a km/h (wire units)
    pub const fn from_centi_kmh(value: u16) -> Self {
        Self(value)
    }

    /// Hundredths of a km/h
    pub const fn centi_kmh(self) -> u16 {
        self.0
    }

    /// Clamp to `max`
    pub fn min(self, max: Speed) -> Self {
        if self.0 > max.0 {
            max
        } else {
            self
        }
    }

    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub const fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }
}

/// Incline in tenths of a percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Incline(u16);

impl Incline {
    pub const ZERO: Self = Self(0);

    /// Create from tenths of a percent (wire units)
    pub const fn from_deci_percent(value: u16) -> Self {
        Self(value)
    }

    /// Tenths of a percent
    pub const fn deci_percent(self) -> u16 {
        self.0
    }

    /// Clamp to `max`
    pub fn min(self, max: Incline) -> Self {
        if self.0 > max.0 {
            max
        } else {
            self
        }
    }

    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub const fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }
}

// Wire values
const FAN_HEAD: u8 = 0x01;
const FAN_CHEST: u8 = 0x02;
const RELAY_WAX_PUMP: u8 = 0x01;

/// Cooling fan selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FanId {
    /// Fan aimed at the runner's head
    Head,
    /// Fan aimed at the runner's chest
    Chest,
}

impl FanId {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            FAN_HEAD => Some(FanId::Head),
            FAN_CHEST => Some(FanId::Chest),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            FanId::Head => FAN_HEAD,
            FanId::Chest => FAN_CHEST,
        }
    }
}

/// Fan output level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FanLevel {
    #[default]
    Off,
    Half,
    Full,
}

impl FanLevel {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(FanLevel::Off),
            1 => Some(FanLevel::Half),
            2 => Some(FanLevel::Full),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            FanLevel::Off => 0,
            FanLevel::Half => 1,
            FanLevel::Full => 2,
        }
    }

    /// Whether the fan is running at all
    pub fn is_on(self) -> bool {
        self != FanLevel::Off
    }
}

/// Relay selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayId {
    /// Belt wax pump (timed by the machine room)
    WaxPump,
}

impl RelayId {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            RELAY_WAX_PUMP => Some(RelayId::WaxPump),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            RelayId::WaxPump => RELAY_WAX_PUMP,
        }
    }
}

/// Relay state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayState {
    Off,
    On,
}

impl RelayState {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(RelayState::Off),
            1 => Some(RelayState::On),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            RelayState::Off => 0,
            RelayState::On => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_conversion() {
        let speed = Speed::from_centi_kmh(1200);
        assert_eq!(speed.to_be_bytes(), [0x04, 0xB0]);
        assert_eq!(Speed::from_be_bytes([0x04, 0xB0]), speed);
    }

    #[test]
    fn test_speed_clamp() {
        let max = Speed::from_centi_kmh(1950);
        assert_eq!(Speed::from_centi_kmh(2400).min(max), max);
        assert_eq!(Speed::from_centi_kmh(800).min(max).centi_kmh(), 800);
    }

    #[test]
    fn test_incline_clamp() {
        let max = Incline::from_deci_percent(150);
        assert_eq!(Incline::from_deci_percent(200).min(max), max);
        assert_eq!(Incline::from_deci_percent(55).min(max).deci_percent(), 55);
        assert_eq!(Incline::from_be_bytes([0x00, 0x37]).deci_percent(), 55);
    }

    #[test]
    fn test_fan_level_bytes() {
        assert_eq!(FanLevel::from_byte(2), Some(FanLevel::Full));
        assert_eq!(FanLevel::from_byte(3), None);
        assert!(!FanLevel::Off.is_on());
    }

    #[test]
    fn test_ids_reject_unknown() {
        assert_eq!(FanId::from_byte(0x03), None);
        assert_eq!(RelayId::from_byte(0x02), None);
        assert_eq!(RelayState::from_byte(2), None);
    }
}
