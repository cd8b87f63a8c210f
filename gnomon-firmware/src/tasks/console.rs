//! Console task
//!
//! Takes each completed console line and logs it. Command handling lives
//! outside this firmware.

use defmt::*;
use gnomon_core::signal::{ClearMode, SignalBus, Signals, WaitFor};

use crate::shared::CONSOLE;

#[embassy_executor::task]
pub async fn console_task(signals: &'static SignalBus) {
    info!("Console task started");

    loop {
        signals
            .wait(Signals::CONSOLE_INPUT, WaitFor::Any, ClearMode::Auto)
            .await;

        let Some(line) = CONSOLE.take_line() else {
            continue;
        };

        if line.overflowed() {
            warn!("Console line truncated");
        }
        match line.as_str() {
            Some(text) => info!("Console: {}", text),
            None => warn!("Console: {=[u8]:x}", line.as_bytes()),
        }
    }
}
