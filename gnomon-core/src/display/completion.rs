//! Bulk transfer completion
//!
//! Runs from the engine's completion interrupt. The channel is only marked
//! idle once the peripheral has fully drained, so a following send never
//! races the tail of the previous one.

use gnomon_hal::{BulkEngine, EngineStatus, SpiChannel};

use super::transport::spin_until;
use crate::signal::{SignalBus, Signals};
use crate::status::{ChannelFault, ChannelRelease, SchedulerState};

/// Tear down a finished bulk transfer and release the display channel
///
/// Order matters and is fixed: engine teardown, error interrupt off, DMA
/// requests off, transmit-empty, shift register idle, overrun cleared,
/// channel idle, then the bus post. The post is skipped before the
/// scheduler runs, since nothing could be waiting on it.
///
/// Returns the fault recorded for this transfer, if any.
pub fn complete_transfer<S: SpiChannel, E: BulkEngine>(
    spi: &mut S,
    engine: &mut E,
    release: &ChannelRelease<'_>,
    signals: &SignalBus,
    scheduler: &SchedulerState,
) -> ChannelFault {
    let engine_status = engine.finish();
    spi.disable_error_interrupt();
    spi.disable_tx_dma();

    let emptied = spin_until(|| spi.is_tx_empty());
    let drained = emptied && spin_until(|| !spi.is_busy());
    let overrun = spi.clear_overrun();

    let fault = if engine_status == EngineStatus::Error {
        ChannelFault::TransferError
    } else if !drained {
        ChannelFault::BusyTimeout
    } else if overrun {
        ChannelFault::Overrun
    } else {
        ChannelFault::None
    };

    if fault != ChannelFault::None {
        #[cfg(feature = "defmt")]
        defmt::warn!("display transfer fault: {}", fault);
        release.record_fault(fault);
    }
    release.release();

    if scheduler.is_running() {
        signals.post(Signals::TRANSFER_COMPLETE);
    }
    fault
}
