//! Backlight task
//!
//! Ramps the backlight whenever the requested screen state changes.

use defmt::*;
use gnomon_core::signal::{ClearMode, SignalBus, Signals, WaitFor};

use super::{BacklightDriver, CoarseDelay};
use crate::shared::DISPLAY_STATE;

#[embassy_executor::task]
pub async fn backlight_task(
    mut backlight: BacklightDriver,
    mut delay: CoarseDelay,
    signals: &'static SignalBus,
) {
    info!("Backlight task started");

    loop {
        signals
            .wait(Signals::BRIGHTNESS_UPDATE, WaitFor::Any, ClearMode::Auto)
            .await;

        let target = DISPLAY_STATE.lock().await.backlight_target();
        debug!("Backlight {} -> {}", backlight.level(), target);

        if let Err(e) = backlight.ramp_to(target, &mut delay).await {
            warn!("Backlight ramp stopped at {}: {:?}", backlight.level(), e);
        }
    }
}
