//! Machine-room outputs behind the [`MachineRoom`] trait
//!
//! The drive speed reference is a filtered PWM output, the fans are pairs of
//! relays (low and high winding), and the drive reports faults on an input
//! pin. Incline and wax pump run in their own tasks and are commanded
//! through signals.

use embassy_rp::gpio::{Input, Output};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use portable_atomic::Ordering;

use cmlink_core::{MachineRoom, VfdStatus};
use cmlink_protocol::{FanId, FanLevel, Incline, RelayState, Speed};

use crate::channels::{
    InclineCommand, INCLINE_CMD, INCLINE_HOMED, INCLINE_POSITION, SENSED_SPEED, WAX_PUMP,
};

/// PWM top for the drive speed reference
const DRIVE_PWM_TOP: u16 = 1000;

/// Relay pair for one two-speed fan
pub struct FanRelays {
    low: Output<'static>,
    high: Output<'static>,
    level: FanLevel,
}

impl FanRelays {
    pub fn new(low: Output<'static>, high: Output<'static>) -> Self {
        let mut relays = Self {
            low,
            high,
            level: FanLevel::Off,
        };
        relays.set(FanLevel::Off);
        relays
    }

    fn set(&mut self, level: FanLevel) {
        // Never energise both windings
        self.low.set_low();
        self.high.set_low();
        match level {
            FanLevel::Off => {}
            FanLevel::Half => self.low.set_high(),
            FanLevel::Full => self.high.set_high(),
        }
        self.level = level;
    }
}

/// Drive interface pins
pub struct Drive {
    pub pwm: Pwm<'static>,
    pub enable: Output<'static>,
    /// Low while the drive reports a fault
    pub ready: Input<'static>,
    /// High while the drive's control cable is plugged in
    pub present: Input<'static>,
}

pub struct MachineIo {
    drive: Drive,
    pwm_config: PwmConfig,
    max_speed: Speed,
    head_fan: FanRelays,
    chest_fan: FanRelays,
}

impl MachineIo {
    pub fn new(mut drive: Drive, max_speed: Speed, head_fan: FanRelays, chest_fan: FanRelays) -> Self {
        let mut pwm_config = PwmConfig::default();
        pwm_config.top = DRIVE_PWM_TOP;
        pwm_config.compare_a = 0;
        drive.pwm.set_config(&pwm_config);
        drive.enable.set_high();

        Self {
            drive,
            pwm_config,
            max_speed,
            head_fan,
            chest_fan,
        }
    }

    fn fan(&mut self, fan: FanId) -> &mut FanRelays {
        match fan {
            FanId::Head => &mut self.head_fan,
            FanId::Chest => &mut self.chest_fan,
        }
    }

    fn drive_duty(&mut self, speed: Speed) {
        let max = self.max_speed.centi_kmh().max(1) as u32;
        let speed = speed.min(self.max_speed).centi_kmh() as u32;
        self.pwm_config.compare_a = (speed * DRIVE_PWM_TOP as u32 / max) as u16;
        self.drive.pwm.set_config(&self.pwm_config);
    }
}

impl MachineRoom for MachineIo {
    fn vfd_status(&self) -> VfdStatus {
        if self.drive.present.is_low() {
            VfdStatus::Disconnected
        } else if self.drive.ready.is_low() {
            VfdStatus::Fault
        } else {
            VfdStatus::Ok
        }
    }

    fn set_speed(&mut self, speed: Speed) {
        self.drive_duty(speed);
    }

    fn sensed_speed(&self) -> Speed {
        Speed::from_centi_kmh(SENSED_SPEED.load(Ordering::Relaxed))
    }

    fn incline_homed(&self) -> bool {
        INCLINE_HOMED.load(Ordering::Relaxed)
    }

    fn set_incline_target(&mut self, incline: Incline) {
        INCLINE_CMD.signal(InclineCommand::MoveTo(incline));
    }

    fn incline_position(&self) -> Incline {
        Incline::from_deci_percent(INCLINE_POSITION.load(Ordering::Relaxed))
    }

    fn start_homing(&mut self) {
        INCLINE_HOMED.store(false, Ordering::Relaxed);
        INCLINE_CMD.signal(InclineCommand::Home);
    }

    fn set_fan(&mut self, fan: FanId, level: FanLevel) {
        self.fan(fan).set(level);
    }

    fn fan_level(&self, fan: FanId) -> FanLevel {
        match fan {
            FanId::Head => self.head_fan.level,
            FanId::Chest => self.chest_fan.level,
        }
    }

    fn set_wax_pump(&mut self, state: RelayState) {
        WAX_PUMP.signal(state);
    }

    fn enter_safe_state(&mut self) {
        self.drive_duty(Speed::ZERO);
        self.drive.enable.set_low();
        self.head_fan.set(FanLevel::Off);
        self.chest_fan.set(FanLevel::Off);
        WAX_PUMP.signal(RelayState::Off);
        INCLINE_CMD.signal(InclineCommand::Stop);
    }

    fn leave_safe_state(&mut self) {
        self.drive.enable.set_high();
    }
}
