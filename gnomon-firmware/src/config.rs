//! Device configuration
//!
//! `build.rs` validates `device.toml` and embeds its postcard encoding; this
//! decodes it once at boot.

use defmt::*;
use gnomon_core::config::DeviceConfig;

/// Encoded configuration written by the build script
static CONFIG_IMAGE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/device_config.bin"));

/// Decode the embedded configuration, falling back to defaults
pub fn load() -> DeviceConfig {
    let config = match postcard::from_bytes::<DeviceConfig>(CONFIG_IMAGE) {
        Ok(config) => config,
        Err(_) => {
            warn!("Embedded config unreadable, using defaults");
            return DeviceConfig::default();
        }
    };

    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            warn!("Embedded config rejected ({:?}), using defaults", e);
            DeviceConfig::default()
        }
    }
}
