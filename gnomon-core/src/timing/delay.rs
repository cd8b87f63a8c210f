//! Dual-mode timed wait
//!
//! Two one-shot hardware timers back every short delay in the firmware:
//!
//! | Timer  | Unit | Counter clock | Longest wait |
//! |--------|------|---------------|--------------|
//! | Coarse | ms   | 2.048 kHz     | 32 000 ms    |
//! | Fine   | µs   | 1 MHz         | 65 535 µs    |
//!
//! Before the scheduler runs, a wait spins on the timer's expired flag,
//! which the update interrupt sets directly. Once the scheduler runs, the
//! waiting task awaits the timer's signal bus bit instead.

use core::hint::spin_loop;

use gnomon_hal::CountdownTimer;

use crate::signal::{ClearMode, SignalBus, Signals, WaitFor};
use crate::status::{SchedulerState, TimerArm, WaitMode};

/// Which hardware timer backs a [`DelayTimer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerId {
    /// Millisecond resolution
    Coarse,
    /// Microsecond resolution
    Fine,
}

impl TimerId {
    /// Bus bit posted on expiry
    pub const fn signal(self) -> Signals {
        match self {
            TimerId::Coarse => Signals::COARSE_TIMER,
            TimerId::Fine => Signals::FINE_TIMER,
        }
    }

    /// Duration units per second
    pub const fn units_per_second(self) -> u32 {
        match self {
            TimerId::Coarse => 1_000,
            TimerId::Fine => 1_000_000,
        }
    }

    /// Longest duration accepted, in this timer's unit
    pub const fn max_duration(self) -> u32 {
        match self {
            TimerId::Coarse => 32_000,
            TimerId::Fine => 65_535,
        }
    }
}

/// Result of a sleep request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepStatus {
    /// The timer was already counting; nothing was armed
    Busy,
    /// The full duration elapsed
    Done,
}

/// Convert a duration to counter ticks, rounding up so a sleep never ends early
pub const fn duration_to_ticks(duration: u32, units_per_second: u32, tick_hz: u32) -> u32 {
    let ticks = (duration as u64 * tick_hz as u64).div_ceil(units_per_second as u64);
    if ticks > u32::MAX as u64 {
        u32::MAX
    } else {
        ticks as u32
    }
}

/// Sleep primitive over one countdown timer
pub struct DelayTimer<'a, T: CountdownTimer> {
    id: TimerId,
    timer: T,
    flag: TimerArm<'a>,
    signals: &'a SignalBus,
    scheduler: &'a SchedulerState,
}

impl<'a, T: CountdownTimer> DelayTimer<'a, T> {
    pub fn new(
        id: TimerId,
        timer: T,
        flag: TimerArm<'a>,
        signals: &'a SignalBus,
        scheduler: &'a SchedulerState,
    ) -> Self {
        Self {
            id,
            timer,
            flag,
            signals,
            scheduler,
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Wait mode matching the scheduler state
    pub fn wait_mode(&self) -> WaitMode {
        self.scheduler.wait_mode()
    }

    /// Longest duration this timer can express
    pub fn max_duration(&self) -> u32 {
        let by_ticks = (T::MAX_TICKS as u64 * self.id.units_per_second() as u64 / T::TICK_HZ as u64)
            .min(u32::MAX as u64) as u32;
        self.id.max_duration().min(by_ticks)
    }

    /// Sleep for `duration` units
    ///
    /// Returns [`SleepStatus::Busy`] at once if the timer is still counting
    /// from an earlier request; callers must not assume queuing. In
    /// [`WaitMode::Spin`] the future completes on its first poll.
    /// [`WaitMode::Cooperative`] needs a running scheduler, since the expiry
    /// interrupt only posts the bus bit then.
    pub async fn sleep(&mut self, duration: u32, mode: WaitMode) -> SleepStatus {
        if duration == 0 {
            return SleepStatus::Done;
        }
        if !self.flag.try_arm() {
            return SleepStatus::Busy;
        }

        let ticks = self.ticks_for(duration);
        match mode {
            WaitMode::Spin => {
                self.timer.start(ticks);
                self.spin_until_expired();
            }
            WaitMode::Cooperative => {
                let bit = self.id.signal();
                // A bit left over from an abandoned wait must not end this one
                self.signals.clear(bit);
                self.timer.start(ticks);
                while !self.flag.is_expired() {
                    self.signals.wait(bit, WaitFor::Any, ClearMode::Auto).await;
                }
            }
        }
        self.flag.acknowledge();
        SleepStatus::Done
    }

    /// Synchronous spin-mode sleep
    pub fn sleep_blocking(&mut self, duration: u32) -> SleepStatus {
        if duration == 0 {
            return SleepStatus::Done;
        }
        if !self.flag.try_arm() {
            return SleepStatus::Busy;
        }
        let ticks = self.ticks_for(duration);
        self.timer.start(ticks);
        self.spin_until_expired();
        self.flag.acknowledge();
        SleepStatus::Done
    }

    fn ticks_for(&self, duration: u32) -> u32 {
        let max = self.max_duration();
        debug_assert!(duration <= max, "sleep duration out of range");
        let ticks = duration_to_ticks(duration.min(max), self.id.units_per_second(), T::TICK_HZ);
        ticks.clamp(1, T::MAX_TICKS)
    }

    fn spin_until_expired(&self) {
        while !self.flag.is_expired() {
            spin_loop();
        }
    }
}
