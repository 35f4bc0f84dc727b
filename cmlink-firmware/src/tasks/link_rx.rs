//! Console link receive task
//!
//! Owns the UART receiver and the byte-stream parser. Each extracted frame
//! is handed to the master under the state lock.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embassy_time::with_timeout;
use embedded_io_async::Read;

use cmlink_core::{Inbound, LinkConfig};
use cmlink_protocol::FrameReceiver;

use crate::channels::SharedMaster;
use crate::clock::{millis, now};
use crate::serial::lock;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

#[embassy_executor::task]
pub async fn link_rx_task(mut rx: BufferedUartRx, master: &'static SharedMaster, config: LinkConfig) {
    info!("Link RX task started");

    let mut receiver = FrameReceiver::with_timeout(config.inter_byte_timeout_ms);
    let mut buf = [0u8; RX_BUF_SIZE];
    let idle = millis(config.inter_byte_timeout_ms);
    let lock_timeout = millis(config.lock_timeout_ms);

    loop {
        let n = match with_timeout(idle, rx.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                warn!("UART read error: {:?}", e);
                continue;
            }
            Err(_) => {
                if receiver.check_timeout(now()) {
                    debug!("Partial frame dropped after idle line");
                }
                continue;
            }
        };

        for &byte in &buf[..n] {
            let at = now();
            let Some(frame) = receiver.feed(byte, at) else {
                continue;
            };

            let Some(mut master) = lock(master, lock_timeout).await else {
                warn!("Master busy, frame seq={} dropped", frame.seq);
                continue;
            };
            let was_connected = master.is_connected();
            let inbound = master.handle_frame(&frame, at);
            let connected = master.is_connected();
            drop(master);

            if connected && !was_connected {
                info!("Machine room link up");
            }
            log_inbound(&inbound);
        }
    }
}

fn log_inbound(inbound: &Inbound) {
    match inbound {
        Inbound::Acked { seq, cmd } => trace!("ACK seq={} cmd={:#04x}", seq, cmd),
        Inbound::Rejected { seq, cmd, code } => {
            warn!("NAK seq={} cmd={:#04x}: {:?}", seq, cmd, code)
        }
        Inbound::Data(response) => trace!("Data: {:?}", response),
        Inbound::Unmatched { seq } => debug!("Late or unknown response seq={}", seq),
        Inbound::Unexpected { seq } => warn!("Response kind mismatch for seq={}", seq),
        Inbound::Malformed(e) => warn!("Malformed response: {:?}", e),
    }
}
