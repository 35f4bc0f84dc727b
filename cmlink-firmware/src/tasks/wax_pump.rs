//! Wax pump relay
//!
//! An ON request runs the pump for a fixed time. A new ON restarts the run,
//! OFF stops it early.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Output;
use embassy_time::{Duration, Timer};

use cmlink_protocol::RelayState;

use crate::channels::WAX_PUMP;

#[embassy_executor::task]
pub async fn wax_pump_task(mut relay: Output<'static>, run_time: Duration) {
    info!("Wax pump task started");
    relay.set_low();

    let mut request = WAX_PUMP.wait().await;
    loop {
        if request == RelayState::Off {
            relay.set_low();
            request = WAX_PUMP.wait().await;
            continue;
        }

        info!("Wax pump on for {} ms", run_time.as_millis());
        relay.set_high();
        request = match select(Timer::after(run_time), WAX_PUMP.wait()).await {
            Either::First(()) => {
                info!("Wax pump run complete");
                RelayState::Off
            }
            Either::Second(next) => next,
        };
    }
}
