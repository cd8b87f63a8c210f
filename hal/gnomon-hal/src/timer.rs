//! Countdown timer abstraction

/// One-pulse down-counting timer with an update interrupt
///
/// `start` loads the counter and lets it run to zero once; the update
/// interrupt fires on underflow and the handler calls `acknowledge`.
pub trait CountdownTimer {
    /// Counter clock in Hz
    const TICK_HZ: u32;

    /// Largest value `start` accepts
    const MAX_TICKS: u32;

    /// Load `ticks` and start counting down
    fn start(&mut self, ticks: u32);

    /// Stop the counter without raising the update interrupt
    fn stop(&mut self);

    /// Clear the pending update flag (interrupt context)
    fn acknowledge(&mut self);
}
