//! Framed UART transmit and bounded locking

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{with_timeout, Duration};
use embedded_io_async::Write;

use cmlink_protocol::{Frame, FrameError};

/// UART transmitter shared by the console tasks
pub type SharedTx = Mutex<CriticalSectionRawMutex, BufferedUartTx>;

/// Transmit failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum TxError {
    /// Frame could not be encoded
    Encode(FrameError),
    /// Transmitter busy for longer than the lock timeout
    LockTimeout,
    /// UART write failed
    Uart,
}

/// Lock `mutex`, giving up after `timeout`
pub async fn lock<T>(
    mutex: &Mutex<CriticalSectionRawMutex, T>,
    timeout: Duration,
) -> Option<MutexGuard<'_, CriticalSectionRawMutex, T>> {
    with_timeout(timeout, mutex.lock()).await.ok()
}

/// Encode and write one frame on an owned transmitter
pub async fn write_frame(tx: &mut BufferedUartTx, frame: &Frame) -> Result<(), TxError> {
    let bytes = frame.encode_to_vec().map_err(TxError::Encode)?;
    tx.write_all(&bytes).await.map_err(|_| TxError::Uart)?;
    tx.flush().await.map_err(|_| TxError::Uart)
}

/// Encode and write one frame on the shared transmitter
pub async fn transmit(tx: &SharedTx, frame: &Frame, lock_timeout: Duration) -> Result<(), TxError> {
    let mut tx = lock(tx, lock_timeout).await.ok_or(TxError::LockTimeout)?;
    write_frame(&mut tx, frame).await
}

/// Transmit and log a failure; the retry sweep covers the lost frame
pub async fn send_logged(tx: &SharedTx, frame: &Frame, lock_timeout: Duration) {
    if let Err(e) = transmit(tx, frame, lock_timeout).await {
        warn!("TX seq={} cmd={:#04x} failed: {:?}", frame.seq, frame.cmd, e);
    }
}
