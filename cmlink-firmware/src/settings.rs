//! Link settings from flash
//!
//! The last flash sector may hold a `LinkConfig` blob written by the
//! service tool. Erased, foreign or invalid contents fall back to defaults.

use defmt::*;
use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

use cmlink_core::config::MAX_CONFIG_SIZE;
use cmlink_core::{ConfigError, LinkConfig};

/// 2MB flash on the controller boards
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Offset of the settings sector from the start of flash
pub const SETTINGS_OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

/// Load the link settings, or the defaults if none are stored
pub fn load_link_config(flash: Peri<'static, FLASH>) -> LinkConfig {
    let mut flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(flash);
    let mut buf = [0u8; MAX_CONFIG_SIZE];

    if flash.blocking_read(SETTINGS_OFFSET, &mut buf).is_err() {
        warn!("Settings sector unreadable, using defaults");
        return LinkConfig::default();
    }

    match LinkConfig::from_bytes(&buf) {
        Ok(config) => {
            info!("Loaded link settings from flash");
            config
        }
        Err(ConfigError::Deserialize | ConfigError::InvalidFormat) => {
            info!("No stored link settings, using defaults");
            LinkConfig::default()
        }
        Err(e) => {
            warn!("Stored link settings rejected ({:?}), using defaults", e);
            LinkConfig::default()
        }
    }
}
