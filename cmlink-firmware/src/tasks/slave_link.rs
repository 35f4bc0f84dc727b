//! Machine-room link task
//!
//! Receives console frames, dispatches them under the state lock and writes
//! the reply. This task is the only writer on the machine-room UART.

use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_time::with_timeout;
use embedded_io_async::Read;

use cmlink_core::{LinkConfig, Outcome};
use cmlink_protocol::FrameReceiver;

use crate::channels::SharedSlave;
use crate::clock::{millis, now};
use crate::serial::{lock, write_frame};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

#[embassy_executor::task]
pub async fn slave_link_task(
    mut rx: BufferedUartRx,
    mut tx: BufferedUartTx,
    slave: &'static SharedSlave,
    config: LinkConfig,
) {
    info!("Slave link task started");

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
                    debug!(
                        "Partial frame dropped, {} framing errors since boot",
                        receiver.stats().framing_errors()
                    );
                }
                continue;
            }
        };

        for &byte in &buf[..n] {
            let at = now();
            let Some(frame) = receiver.feed(byte, at) else {
                continue;
            };

            let reply = {
                let Some(mut slave) = lock(slave, lock_timeout).await else {
                    warn!("Slave busy, seq={} dropped", frame.seq);
                    continue;
                };
                slave.on_frame(&frame, at)
            };

            let reply = match reply {
                Ok(reply) => reply,
                Err(e) => {
                    error!("Reply to seq={} not encodable: {:?}", frame.seq, e);
                    continue;
                }
            };

            match reply.outcome {
                Outcome::Data => trace!("Poll {:#04x} answered", frame.cmd),
                Outcome::Applied(command) => debug!("Applied {:?}", command),
                Outcome::Rejected(code) => {
                    warn!("Rejected seq={} cmd={:#04x}: {:?}", frame.seq, frame.cmd, code)
                }
            }

            if let Err(e) = write_frame(&mut tx, &reply.frame).await {
                warn!("Reply seq={} failed: {:?}", frame.seq, e);
            }
        }
    }
}
