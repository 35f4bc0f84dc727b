//! Link watchdog task
//!
//! Checks the slave's watchdog on a fixed period. A trip puts the outputs in
//! the safe state; the next console frame releases them.

use defmt::*;
use embassy_time::Ticker;

use cmlink_core::LinkConfig;

use crate::channels::SharedSlave;
use crate::clock::{millis, now};
use crate::serial::lock;

#[embassy_executor::task]
pub async fn watchdog_task(slave: &'static SharedSlave, config: LinkConfig) {
    info!("Watchdog task started");

    let lock_timeout = millis(config.lock_timeout_ms);
    let mut ticker = Ticker::every(millis(config.watchdog_period_ms));

    loop {
        ticker.next().await;

        let Some(mut slave) = lock(slave, lock_timeout).await else {
            warn!("Slave busy, watchdog check skipped");
            continue;
        };
        if let Some(event) = slave.tick(now()) {
            error!("Console silent for {} ms, outputs safe", event.silent_ms);
        }
    }
}
