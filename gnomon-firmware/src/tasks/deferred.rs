//! Deferred interrupt task
//!
//! Drains due entries from the deferred gating queue on a fixed period.

use defmt::*;
use embassy_time::{Duration, Ticker};
use gnomon_hal_stm32f4::NvicGate;

use crate::shared::{now_ms, DEFERRED};

#[embassy_executor::task]
pub async fn deferred_task(poll_ms: u32) {
    info!("Deferred task started ({} ms)", poll_ms);

    let mut ticker = Ticker::every(Duration::from_millis(poll_ms as u64));
    let mut gate = NvicGate;

    loop {
        ticker.next().await;

        let retired = DEFERRED.retire_due(now_ms(), &mut gate);
        if retired > 0 {
            trace!("Retired {} deferred requests", retired);
        }
    }
}
