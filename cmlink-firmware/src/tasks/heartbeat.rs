//! Heartbeat task
//!
//! Each period either sends one pending speed/incline change or issues a
//! round of polls spaced apart so the machine room can answer each in turn.

use defmt::*;
use embassy_time::{Ticker, Timer};

use cmlink_core::{HeartbeatStep, LinkConfig};

use crate::channels::SharedMaster;
use crate::clock::{millis, now};
use crate::serial::{lock, send_logged, SharedTx};

#[embassy_executor::task]
pub async fn heartbeat_task(master: &'static SharedMaster, tx: &'static SharedTx, config: LinkConfig) {
    info!("Heartbeat task started");

    let lock_timeout = millis(config.lock_timeout_ms);
    let spacing = millis(config.poll_spacing_ms);
    let mut ticker = Ticker::every(millis(config.heartbeat_period_ms));

    loop {
        ticker.next().await;

        let step = match lock(master, lock_timeout).await {
            Some(mut master) => master.heartbeat(now()),
            None => {
                debug!("Master busy, heartbeat skipped");
                continue;
            }
        };

        match step {
            Ok(HeartbeatStep::Set(frame)) => {
                debug!("Set seq={} cmd={:#04x}", frame.seq, frame.cmd);
                send_logged(tx, &frame, lock_timeout).await;
            }
            Ok(HeartbeatStep::Poll(polls)) => {
                for (i, command) in polls.iter().enumerate() {
                    if i > 0 {
                        Timer::after(spacing).await;
                    }
                    let sent = match lock(master, lock_timeout).await {
                        Some(mut master) => master.send(*command, now()),
                        None => continue,
                    };
                    match sent {
                        Ok(frame) => send_logged(tx, &frame, lock_timeout).await,
                        Err(e) => warn!("Poll {:?} not sent: {:?}", command, e),
                    }
                }
            }
            Err(e) => warn!("Heartbeat failed: {:?}", e),
        }
    }
}
