//! Belt speed sensor
//!
//! Counts pulses from the roller sensor over a fixed window and publishes
//! the belt speed.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{with_deadline, Duration, Instant};
use portable_atomic::Ordering;

use crate::channels::SENSED_SPEED;

/// Measurement window
const WINDOW_MS: u64 = 500;

/// Belt travel per sensor pulse, in micrometres
pub const DEFAULT_UM_PER_PULSE: u32 = 15_700;

/// Convert a pulse count over one window to km/h x 100
fn centi_kmh(pulses: u32, um_per_pulse: u32) -> u16 {
    // um per window -> um/s -> km/h x 100 (1 um/s = 0.00036 centi-km/h)
    let um_per_s = pulses as u64 * um_per_pulse as u64 * 1000 / WINDOW_MS;
    (um_per_s * 36 / 100_000).min(u16::MAX as u64) as u16
}

#[embassy_executor::task]
pub async fn speed_sensor_task(mut pulse: Input<'static>, um_per_pulse: u32) {
    info!("Speed sensor task started");

    loop {
        let deadline = Instant::now() + Duration::from_millis(WINDOW_MS);
        let mut pulses: u32 = 0;
        while with_deadline(deadline, pulse.wait_for_rising_edge()).await.is_ok() {
            pulses += 1;
        }

        let speed = centi_kmh(pulses, um_per_pulse);
        trace!("Belt: {} pulses, {} cKm/h", pulses, speed);
        SENSED_SPEED.store(speed, Ordering::Relaxed);
    }
}
