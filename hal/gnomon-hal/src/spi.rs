//! Serial channel abstractions
//!
//! The display link is transmit-only. Instead of a transfer-level bus API
//! this trait exposes the handful of status and control bits the blocking
//! sender and the bulk-transfer completion path poll and flip directly.

/// Transmit side of a serial peripheral channel
pub trait SpiChannel {
    /// Write one byte into the data register
    fn write_byte(&mut self, byte: u8);

    /// Transmit buffer empty flag
    fn is_tx_empty(&self) -> bool;

    /// Shift register busy flag
    fn is_busy(&self) -> bool;

    /// Route transmit-empty requests to the bulk engine
    fn enable_tx_dma(&mut self);

    /// Stop routing transmit-empty requests to the bulk engine
    fn disable_tx_dma(&mut self);

    /// Enable the channel's error interrupt
    fn enable_error_interrupt(&mut self);

    /// Disable the channel's error interrupt
    fn disable_error_interrupt(&mut self);

    /// Clear a pending overrun condition
    ///
    /// Returns `true` if an overrun was flagged before clearing.
    fn clear_overrun(&mut self) -> bool;
}
