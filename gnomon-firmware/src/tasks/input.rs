//! Input task
//!
//! Buttons: middle toggles the screen, left and right step the brightness.
//! Touch and motion interrupts are only logged for now.

use defmt::*;
use gnomon_core::signal::{ClearMode, SignalBus, Signals, WaitFor};

use crate::shared::DISPLAY_STATE;

#[embassy_executor::task]
pub async fn input_task(signals: &'static SignalBus) {
    info!("Input task started");

    let watched = Signals::BUTTONS | Signals::TOUCH | Signals::IMU_INT1;

    loop {
        let fired = signals.wait(watched, WaitFor::Any, ClearMode::Auto).await;
        let mut post = Signals::empty();

        {
            let mut state = DISPLAY_STATE.lock().await;

            if fired.contains(Signals::BUTTON_M) {
                state.on = !state.on;
                post |= if state.on {
                    Signals::DISPLAY_ON
                } else {
                    Signals::DISPLAY_OFF
                };
                post |= Signals::BRIGHTNESS_UPDATE;
                debug!("Button M: display {}", if state.on { "on" } else { "off" });
            }

            if state.on && fired.contains(Signals::BUTTON_L) {
                state.dimmer();
                post |= Signals::BRIGHTNESS_UPDATE;
                debug!("Button L: brightness {}", state.brightness);
            }

            if state.on && fired.contains(Signals::BUTTON_R) {
                state.brighter();
                post |= Signals::BRIGHTNESS_UPDATE;
                debug!("Button R: brightness {}", state.brightness);
            }
        }

        if fired.contains(Signals::TOUCH) {
            trace!("Touch interrupt");
        }
        if fired.contains(Signals::IMU_INT1) {
            trace!("IMU interrupt");
        }

        if !post.is_empty() {
            signals.post(post);
        }
    }
}
