//! Operator buttons
//!
//! Speed and incline buttons move the targets; the heartbeat carries them to
//! the machine room. Stop and wax go out immediately as actions.

use defmt::*;
use embassy_futures::select::select_array;
use embassy_rp::gpio::Input;
use embassy_time::Timer;

use cmlink_core::LinkConfig;
use cmlink_protocol::{Command, Incline, RelayId, RelayState, Speed};

use crate::channels::SharedMaster;
use crate::clock::{millis, now};
use crate::serial::{lock, send_logged, SharedTx};

/// Speed change per press, km/h x 100
const SPEED_STEP: u16 = 10;

/// Incline change per press, % x 10
const INCLINE_STEP: u16 = 5;

/// Ignore contact bounce for this long after a press
const DEBOUNCE_MS: u32 = 50;

/// Front-panel buttons, active low
pub struct Buttons {
    pub speed_up: Input<'static>,
    pub speed_down: Input<'static>,
    pub incline_up: Input<'static>,
    pub incline_down: Input<'static>,
    pub stop: Input<'static>,
    pub wax: Input<'static>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
enum Press {
    SpeedUp,
    SpeedDown,
    InclineUp,
    InclineDown,
    Stop,
    Wax,
}

const PRESSES: [Press; 6] = [
    Press::SpeedUp,
    Press::SpeedDown,
    Press::InclineUp,
    Press::InclineDown,
    Press::Stop,
    Press::Wax,
];

#[embassy_executor::task]
pub async fn controls_task(
    buttons: Buttons,
    master: &'static SharedMaster,
    tx: &'static SharedTx,
    config: LinkConfig,
) {
    info!("Controls task started");

    let Buttons {
        speed_up,
        speed_down,
        incline_up,
        incline_down,
        stop,
        wax,
    } = buttons;
    let mut inputs = [speed_up, speed_down, incline_up, incline_down, stop, wax];
    let lock_timeout = millis(config.lock_timeout_ms);

    loop {
        let (_, index) = select_array(inputs.each_mut().map(|b| b.wait_for_falling_edge())).await;
        let press = PRESSES[index];
        debug!("Button: {:?}", press);

        let action = {
            let Some(mut master) = lock(master, lock_timeout).await else {
                warn!("Master busy, {:?} ignored", press);
                continue;
            };
            match press {
                Press::SpeedUp => {
                    let target = master.target_speed().centi_kmh().saturating_add(SPEED_STEP);
                    master.set_target_speed(Speed::from_centi_kmh(target));
                    None
                }
                Press::SpeedDown => {
                    let target = master.target_speed().centi_kmh().saturating_sub(SPEED_STEP);
                    master.set_target_speed(Speed::from_centi_kmh(target));
                    None
                }
                Press::InclineUp => {
                    let target = master.target_incline().deci_percent().saturating_add(INCLINE_STEP);
                    master.set_target_incline(Incline::from_deci_percent(target));
                    None
                }
                Press::InclineDown => {
                    let target = master.target_incline().deci_percent().saturating_sub(INCLINE_STEP);
                    master.set_target_incline(Incline::from_deci_percent(target));
                    None
                }
                Press::Stop => {
                    master.set_target_speed(Speed::ZERO);
                    Some(master.send(Command::EmergencyStop, now()))
                }
                Press::Wax => Some(master.send(
                    Command::SetRelay {
                        relay: RelayId::WaxPump,
                        state: RelayState::On,
                    },
                    now(),
                )),
            }
        };

        match action {
            Some(Ok(frame)) => send_logged(tx, &frame, lock_timeout).await,
            Some(Err(e)) => warn!("{:?} not sent: {:?}", press, e),
            None => {}
        }

        Timer::after(millis(DEBOUNCE_MS)).await;
    }
}
