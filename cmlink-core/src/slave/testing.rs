//! In-memory machine room for unit tests

use cmlink_protocol::{FanId, FanLevel, Incline, RelayState, Speed};

use crate::traits::{MachineRoom, VfdStatus};

#[derive(Debug, Default)]
pub struct FakeMachine {
    pub vfd: VfdStatus,
    pub speed_target: Speed,
    pub sensed_speed: Speed,
    pub homed: bool,
    pub homing_started: u32,
    pub incline_target: Incline,
    pub incline_position: Incline,
    pub head_fan: FanLevel,
    pub chest_fan: FanLevel,
    pub wax_pump: Option<RelayState>,
    pub safe_state_entries: u32,
    pub safe_state_exits: u32,
}

impl FakeMachine {
    /// Drive ready and incline homed
    pub fn ready() -> Self {
        Self {
            vfd: VfdStatus::Ok,
            homed: true,
            ..Self::default()
        }
    }
}

impl MachineRoom for FakeMachine {
    fn vfd_status(&self) -> VfdStatus {
        self.vfd
    }

    fn set_speed(&mut self, speed: Speed) {
        self.speed_target = speed;
    }

    fn sensed_speed(&self) -> Speed {
        self.sensed_speed
    }

    fn incline_homed(&self) -> bool {
        self.homed
    }

    fn set_incline_target(&mut self, incline: Incline) {
        self.incline_target = incline;
    }

    fn incline_position(&self) -> Incline {
        self.incline_position
    }

    fn start_homing(&mut self) {
        self.homed = false;
        self.homing_started += 1;
    }

    fn set_fan(&mut self, fan: FanId, level: FanLevel) {
        match fan {
            FanId::Head => self.head_fan = level,
            FanId::Chest => self.chest_fan = level,
        }
    }

    fn fan_level(&self, fan: FanId) -> FanLevel {
        match fan {
            FanId::Head => self.head_fan,
            FanId::Chest => self.chest_fan,
        }
    }

    fn set_wax_pump(&mut self, state: RelayState) {
        self.wax_pump = Some(state);
    }

    fn enter_safe_state(&mut self) {
        self.safe_state_entries += 1;
        self.speed_target = Speed::ZERO;
        self.incline_target = Incline::ZERO;
        self.head_fan = FanLevel::Off;
        self.chest_fan = FanLevel::Off;
        self.wax_pump = Some(RelayState::Off);
    }

    fn leave_safe_state(&mut self) {
        self.safe_state_exits += 1;
    }
}
