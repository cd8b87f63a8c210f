//! Display task
//!
//! Owns the panel. Clears it once, then follows display on/off requests.

use defmt::*;
use gnomon_core::display::TransmitError;
use gnomon_core::signal::{ClearMode, SignalBus, Signals, WaitFor};
use gnomon_core::status::ChannelFault;
use gnomon_core::timing::SleepStatus;
use gnomon_protocol::Rgb565;

use super::{DisplayPanel, FineDelay};
use crate::shared::DISPLAY_STATE;

/// Wait after sleep-out before the next command, µs
const WAKE_SETTLE_US: u32 = 5_000;

/// Wait after display-on, µs
const ON_SETTLE_US: u32 = 20_000;

#[embassy_executor::task]
pub async fn display_task(mut panel: DisplayPanel, mut delay: FineDelay, signals: &'static SignalBus) {
    info!("Display task started");

    let area = panel.full_area();
    if let Err(e) = panel.fill(area, Rgb565::BLACK).await {
        warn!("Panel clear failed: {:?}", e);
    }

    let mut on = true;
    loop {
        signals
            .wait(
                Signals::DISPLAY_ON | Signals::DISPLAY_OFF,
                WaitFor::Any,
                ClearMode::Auto,
            )
            .await;

        // Several presses may land before this task runs; act on the latest
        let wanted = DISPLAY_STATE.lock().await.on;
        if wanted == on {
            continue;
        }

        let result = if wanted {
            power_on(&mut panel, &mut delay).await
        } else {
            power_off(&mut panel)
        };
        match result {
            Ok(()) => on = wanted,
            Err(e) => warn!("Display power change failed: {:?}", e),
        }

        let fault = panel.transport().take_fault();
        if fault != ChannelFault::None {
            warn!("Display channel fault: {:?}", fault);
        }
    }
}

async fn power_on(panel: &mut DisplayPanel, delay: &mut FineDelay) -> Result<(), TransmitError> {
    panel.sleep_out()?;
    settle(delay, WAKE_SETTLE_US).await?;
    panel.display_on()?;
    settle(delay, ON_SETTLE_US).await?;
    debug!("Display on");
    Ok(())
}

fn power_off(panel: &mut DisplayPanel) -> Result<(), TransmitError> {
    panel.display_off()?;
    panel.sleep_in()?;
    debug!("Display off");
    Ok(())
}

async fn settle(delay: &mut FineDelay, us: u32) -> Result<(), TransmitError> {
    let mode = delay.wait_mode();
    match delay.sleep(us, mode).await {
        SleepStatus::Done => Ok(()),
        SleepStatus::Busy => Err(TransmitError::TimerBusy),
    }
}
