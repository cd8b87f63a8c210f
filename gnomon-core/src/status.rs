//! ISR-shared status cells
//!
//! The few flags that both an interrupt handler and a task touch are plain
//! atomics with no lock. Each cell hands out exactly two handles: a task
//! handle that can only claim and acknowledge, and an interrupt handle that
//! can only release and record. [`SystemStatus::split`] produces both sets
//! once and neither handle type is `Clone`.

use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::signal::SignalBus;

/// Serial channel state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    Idle,
    Busy,
}

/// Hardware fault recorded by a completion handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelFault {
    #[default]
    None,
    /// Receive overrun was pending and has been cleared
    Overrun,
    /// Shift register never went idle within the spin limit
    BusyTimeout,
    /// The bulk engine reported a transfer error
    TransferError,
}

impl ChannelFault {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => ChannelFault::Overrun,
            2 => ChannelFault::BusyTimeout,
            3 => ChannelFault::TransferError,
            _ => ChannelFault::None,
        }
    }

    fn bits(self) -> u8 {
        match self {
            ChannelFault::None => 0,
            ChannelFault::Overrun => 1,
            ChannelFault::BusyTimeout => 2,
            ChannelFault::TransferError => 3,
        }
    }
}

const IDLE: u8 = 0;
const BUSY: u8 = 1;

/// Busy/idle flag for one physical channel
pub struct ChannelStatus {
    state: AtomicU8,
    fault: AtomicU8,
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelStatus {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
            fault: AtomicU8::new(0),
        }
    }

    fn state(&self) -> ChannelState {
        if self.state.load(Ordering::Acquire) == BUSY {
            ChannelState::Busy
        } else {
            ChannelState::Idle
        }
    }
}

/// Task-side handle: claims the channel before arming hardware
pub struct ChannelClaim<'a> {
    status: &'a ChannelStatus,
}

impl<'a> ChannelClaim<'a> {
    /// Move `Idle -> Busy`
    ///
    /// Returns `false` if a transfer is already outstanding.
    #[must_use]
    pub fn try_claim(&self) -> bool {
        self.status
            .state
            .compare_exchange(IDLE, BUSY, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn state(&self) -> ChannelState {
        self.status.state()
    }

    pub fn is_idle(&self) -> bool {
        self.state() == ChannelState::Idle
    }

    /// Read and clear the last recorded fault
    pub fn take_fault(&self) -> ChannelFault {
        ChannelFault::from_bits(self.status.fault.swap(0, Ordering::AcqRel))
    }
}

/// Interrupt-side handle: releases the channel after hardware teardown
pub struct ChannelRelease<'a> {
    status: &'a ChannelStatus,
}

impl<'a> ChannelRelease<'a> {
    /// Move to `Idle`
    pub fn release(&self) {
        self.status.state.store(IDLE, Ordering::Release);
    }

    /// Record a fault for the task side to pick up
    pub fn record_fault(&self, fault: ChannelFault) {
        if fault != ChannelFault::None {
            self.status.fault.store(fault.bits(), Ordering::Release);
        }
    }

    pub fn state(&self) -> ChannelState {
        self.status.state()
    }
}

/// Countdown timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerState {
    Idle,
    Counting,
    Expired,
}

const TIMER_IDLE: u8 = 0;
const TIMER_COUNTING: u8 = 1;
const TIMER_EXPIRED: u8 = 2;

/// Per-timer "expired" flag
pub struct TimerFlag {
    state: AtomicU8,
}

impl Default for TimerFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerFlag {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(TIMER_IDLE),
        }
    }

    fn state(&self) -> TimerState {
        match self.state.load(Ordering::Acquire) {
            TIMER_COUNTING => TimerState::Counting,
            TIMER_EXPIRED => TimerState::Expired,
            _ => TimerState::Idle,
        }
    }
}

/// Task-side timer handle
pub struct TimerArm<'a> {
    flag: &'a TimerFlag,
}

impl<'a> TimerArm<'a> {
    /// Move to `Counting` unless already counting
    ///
    /// A stale `Expired` from an abandoned wait is overwritten.
    #[must_use]
    pub fn try_arm(&self) -> bool {
        self.flag
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s != TIMER_COUNTING).then_some(TIMER_COUNTING)
            })
            .is_ok()
    }

    /// Move `Expired -> Idle`; a running count is left alone
    pub fn acknowledge(&self) {
        let _ = self.flag.state.compare_exchange(
            TIMER_EXPIRED,
            TIMER_IDLE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn state(&self) -> TimerState {
        self.flag.state()
    }

    pub fn is_expired(&self) -> bool {
        self.state() == TimerState::Expired
    }
}

/// Interrupt-side timer handle
pub struct TimerExpiry<'a> {
    flag: &'a TimerFlag,
}

impl<'a> TimerExpiry<'a> {
    /// Mark the countdown finished
    pub fn expire(&self) {
        self.flag.state.store(TIMER_EXPIRED, Ordering::Release);
    }

    pub fn state(&self) -> TimerState {
        self.flag.state()
    }
}

/// How a blocking primitive waits for its completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitMode {
    /// Poll a status flag; usable before the scheduler starts
    Spin,
    /// Await a signal bus bit; the scheduler runs other tasks meanwhile
    Cooperative,
}

/// Whether the task scheduler has started
pub struct SchedulerState {
    running: AtomicBool,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerState {
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Called once, right before the executor starts polling tasks
    pub fn mark_running(&self) {
        self.running.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Wait mode matching the scheduler state
    pub fn wait_mode(&self) -> WaitMode {
        if self.is_running() {
            WaitMode::Cooperative
        } else {
            WaitMode::Spin
        }
    }
}

/// All state shared between interrupt handlers and tasks
///
/// Lives in a `static`; split once at start-up.
pub struct SystemStatus {
    signals: SignalBus,
    scheduler: SchedulerState,
    display: ChannelStatus,
    coarse: TimerFlag,
    fine: TimerFlag,
    split: AtomicBool,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStatus {
    pub const fn new() -> Self {
        Self {
            signals: SignalBus::new(),
            scheduler: SchedulerState::new(),
            display: ChannelStatus::new(),
            coarse: TimerFlag::new(),
            fine: TimerFlag::new(),
            split: AtomicBool::new(false),
        }
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    pub fn scheduler(&self) -> &SchedulerState {
        &self.scheduler
    }

    /// Hand out the task and interrupt handle sets
    ///
    /// Returns `None` on every call after the first.
    pub fn split(&self) -> Option<(TaskSide<'_>, IsrSide<'_>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }

        let task = TaskSide {
            display: ChannelClaim {
                status: &self.display,
            },
            coarse: TimerArm { flag: &self.coarse },
            fine: TimerArm { flag: &self.fine },
            signals: &self.signals,
            scheduler: &self.scheduler,
        };
        let isr = IsrSide {
            display: ChannelRelease {
                status: &self.display,
            },
            coarse: TimerExpiry { flag: &self.coarse },
            fine: TimerExpiry { flag: &self.fine },
            signals: &self.signals,
            scheduler: &self.scheduler,
        };
        Some((task, isr))
    }
}

/// Handles usable from task context
pub struct TaskSide<'a> {
    pub display: ChannelClaim<'a>,
    pub coarse: TimerArm<'a>,
    pub fine: TimerArm<'a>,
    pub signals: &'a SignalBus,
    pub scheduler: &'a SchedulerState,
}

/// Handles usable from interrupt context
pub struct IsrSide<'a> {
    pub display: ChannelRelease<'a>,
    pub coarse: TimerExpiry<'a>,
    pub fine: TimerExpiry<'a>,
    pub signals: &'a SignalBus,
    pub scheduler: &'a SchedulerState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_once() {
        let status = SystemStatus::new();
        assert!(status.split().is_some());
        assert!(status.split().is_none());
    }

    #[test]
    fn test_channel_claim_and_release() {
        let status = SystemStatus::new();
        let (task, isr) = status.split().unwrap();

        assert!(task.display.try_claim());
        // Second claim while busy fails
        assert!(!task.display.try_claim());
        assert_eq!(isr.display.state(), ChannelState::Busy);

        isr.display.release();
        assert!(task.display.is_idle());
        assert!(task.display.try_claim());
    }

    #[test]
    fn test_fault_is_read_once() {
        let status = SystemStatus::new();
        let (task, isr) = status.split().unwrap();

        isr.display.record_fault(ChannelFault::Overrun);
        isr.display.record_fault(ChannelFault::None);
        assert_eq!(task.display.take_fault(), ChannelFault::Overrun);
        assert_eq!(task.display.take_fault(), ChannelFault::None);
    }

    #[test]
    fn test_timer_flag_lifecycle() {
        let status = SystemStatus::new();
        let (task, isr) = status.split().unwrap();

        assert!(task.coarse.try_arm());
        assert!(!task.coarse.try_arm());
        // Acknowledge does not cancel a running count
        task.coarse.acknowledge();
        assert_eq!(task.coarse.state(), TimerState::Counting);

        isr.coarse.expire();
        assert!(task.coarse.is_expired());
        task.coarse.acknowledge();
        assert_eq!(task.coarse.state(), TimerState::Idle);

        // Timers are independent
        assert_eq!(task.fine.state(), TimerState::Idle);
    }

    #[test]
    fn test_stale_expiry_can_be_rearmed() {
        let status = SystemStatus::new();
        let (task, isr) = status.split().unwrap();

        assert!(task.fine.try_arm());
        isr.fine.expire();
        assert!(task.fine.try_arm());
        assert_eq!(task.fine.state(), TimerState::Counting);
    }

    #[test]
    fn test_wait_mode_follows_scheduler() {
        let status = SystemStatus::new();
        assert_eq!(status.scheduler().wait_mode(), WaitMode::Spin);
        status.scheduler().mark_running();
        assert_eq!(status.scheduler().wait_mode(), WaitMode::Cooperative);
    }
}
