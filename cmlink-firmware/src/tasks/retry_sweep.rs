//! Retry sweep task
//!
//! Expires pending requests on a fixed period. Retransmissions are copied
//! out of the master and written after the lock is released.

use defmt::*;
use embassy_time::Ticker;

use cmlink_core::LinkConfig;

use crate::channels::SharedMaster;
use crate::clock::{millis, now};
use crate::serial::{lock, send_logged, SharedTx};

#[embassy_executor::task]
pub async fn retry_sweep_task(master: &'static SharedMaster, tx: &'static SharedTx, config: LinkConfig) {
    info!("Retry sweep task started");

    let lock_timeout = millis(config.lock_timeout_ms);
    let mut ticker = Ticker::every(millis(config.sweep_period_ms));

    loop {
        ticker.next().await;

        let report = match lock(master, lock_timeout).await {
            Some(mut master) => master.sweep(now()),
            None => {
                debug!("Master busy, sweep skipped");
                continue;
            }
        };

        for abandoned in &report.abandoned {
            warn!(
                "Gave up on seq={} cmd={:#04x} after {} retries",
                abandoned.seq, abandoned.cmd, config.max_retries
            );
        }
        if report.link_lost {
            error!("Machine room link lost");
        }

        for frame in &report.retransmit {
            debug!("Retransmit seq={} cmd={:#04x}", frame.seq, frame.cmd);
            send_logged(tx, frame, lock_timeout).await;
        }
    }
}
