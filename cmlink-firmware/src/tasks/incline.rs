//! Incline motor
//!
//! The lift has up/down contactors and a lower limit switch but no position
//! sensor, so position is dead-reckoned from run time at the rated lift
//! speed. Homing drives down to the limit switch and zeroes the estimate.

use defmt::*;
use embassy_rp::gpio::{Input, Output};
use embassy_time::{Duration, Ticker};
use portable_atomic::Ordering;

use crate::channels::{InclineCommand, INCLINE_CMD, INCLINE_HOMED, INCLINE_POSITION};

/// Control tick
const TICK_MS: u64 = 100;

/// Incline travel per tick at rated lift speed, % x 10
const TRAVEL_PER_TICK: u16 = 1;

/// Incline lift pins
pub struct InclineMotor {
    pub up: Output<'static>,
    pub down: Output<'static>,
    /// Low at the lower limit
    pub lower_limit: Input<'static>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
enum Motion {
    Idle,
    Homing,
    Moving { target: u16 },
}

impl InclineMotor {
    fn stop(&mut self) {
        self.up.set_low();
        self.down.set_low();
    }

    fn raise(&mut self) {
        self.down.set_low();
        self.up.set_high();
    }

    fn lower(&mut self) {
        self.up.set_low();
        self.down.set_high();
    }
}

#[embassy_executor::task]
pub async fn incline_task(mut motor: InclineMotor) {
    info!("Incline task started");
    motor.stop();

    let mut motion = Motion::Idle;
    let mut position: u16 = 0;
    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS));

    loop {
        if let Some(cmd) = INCLINE_CMD.try_take() {
            debug!("Incline command: {:?}", cmd);
            motion = match cmd {
                InclineCommand::Home => Motion::Homing,
                InclineCommand::MoveTo(incline) => Motion::Moving {
                    target: incline.deci_percent(),
                },
                InclineCommand::Stop => Motion::Idle,
            };
        }

        motion = match motion {
            Motion::Idle => {
                motor.stop();
                Motion::Idle
            }
            Motion::Homing => {
                if motor.lower_limit.is_low() {
                    motor.stop();
                    position = 0;
                    INCLINE_HOMED.store(true, Ordering::Relaxed);
                    info!("Incline homed");
                    Motion::Idle
                } else {
                    motor.lower();
                    Motion::Homing
                }
            }
            Motion::Moving { target } if target > position => {
                motor.raise();
                position = position.saturating_add(TRAVEL_PER_TICK).min(target);
                Motion::Moving { target }
            }
            Motion::Moving { target } if target < position => {
                if motor.lower_limit.is_low() {
                    // Estimate drifted; the switch is the truth
                    position = 0;
                    Motion::Idle
                } else {
                    motor.lower();
                    position = position.saturating_sub(TRAVEL_PER_TICK).max(target);
                    Motion::Moving { target }
                }
            }
            Motion::Moving { .. } => {
                motor.stop();
                Motion::Idle
            }
        };
        INCLINE_POSITION.store(position, Ordering::Relaxed);

        ticker.next().await;
    }
}
