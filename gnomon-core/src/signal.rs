//! Cross-context signal bus
//!
//! A process-wide event register. Interrupt handlers post bits; tasks wait
//! for any or all of a set of bits and choose whether the wait consumes them.
//! Posting never blocks and never allocates, so it is safe from any context.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::{Context, Poll};

use bitflags::bitflags;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;

/// Maximum tasks that can wait on the bus at once
pub const MAX_WAITERS: usize = 8;

bitflags! {
    /// Condition bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Signals: u32 {
        /// Millisecond timer expired
        const COARSE_TIMER = 1 << 0;
        /// Microsecond timer expired
        const FINE_TIMER = 1 << 1;
        /// Display bulk transfer finished
        const TRANSFER_COMPLETE = 1 << 2;
        /// Middle button pressed
        const BUTTON_M = 1 << 3;
        /// Left button pressed
        const BUTTON_L = 1 << 4;
        /// Right button pressed
        const BUTTON_R = 1 << 5;
        /// Display should switch off
        const DISPLAY_OFF = 1 << 6;
        /// Display should switch on
        const DISPLAY_ON = 1 << 7;
        /// Backlight level changed
        const BRIGHTNESS_UPDATE = 1 << 8;
        /// Inertial sensor interrupt line 1
        const IMU_INT1 = 1 << 9;
        /// Inertial sensor interrupt line 2
        const IMU_INT2 = 1 << 10;
        /// Inertial sensor bus transfer finished
        const IMU_TX_COMPLETE = 1 << 11;
        /// Touch controller interrupt
        const TOUCH = 1 << 12;
        /// Real-time clock needs a resync
        const RTC_RESYNC = 1 << 13;
        /// A console line is ready
        const CONSOLE_INPUT = 1 << 14;
        /// Start-up finished
        const SYSTEM_INITIALIZED = 1 << 23;

        const BUTTONS = Self::BUTTON_M.bits() | Self::BUTTON_L.bits() | Self::BUTTON_R.bits();
        const DISPLAY_REQUESTS = Self::DISPLAY_OFF.bits()
            | Self::DISPLAY_ON.bits()
            | Self::BRIGHTNESS_UPDATE.bits();
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Signals {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Signals({=u32:#x})", self.bits())
    }
}

/// Whether a wait needs one or every requested bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitFor {
    Any,
    All,
}

/// What a satisfied wait does with the bits it matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClearMode {
    /// Clear the matched bits
    Auto,
    /// Leave them set for other waiters
    Manual,
}

struct BusState {
    bits: Signals,
    waiters: MultiWakerRegistration<MAX_WAITERS>,
}

impl BusState {
    fn matched(&self, mask: Signals, wait_for: WaitFor) -> Option<Signals> {
        let hit = self.bits & mask;
        let satisfied = match wait_for {
            WaitFor::Any => !hit.is_empty(),
            WaitFor::All => hit == mask,
        };
        satisfied.then_some(hit)
    }

    fn take(&mut self, mask: Signals, wait_for: WaitFor, clear: ClearMode) -> Option<Signals> {
        let hit = self.matched(mask, wait_for)?;
        if clear == ClearMode::Auto {
            self.bits.remove(hit);
        }
        Some(hit)
    }
}

/// Multi-bit event register shared between interrupt and task context
pub struct SignalBus {
    state: Mutex<CriticalSectionRawMutex, RefCell<BusState>>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBus {
    /// Create an empty bus
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(BusState {
                bits: Signals::empty(),
                waiters: MultiWakerRegistration::new(),
            })),
        }
    }

    /// Set `bits` and wake every waiter
    pub fn post(&self, bits: Signals) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.bits.insert(bits);
            state.waiters.wake();
        });
    }

    /// Clear `bits` without waking anyone
    pub fn clear(&self, bits: Signals) {
        self.state.lock(|state| state.borrow_mut().bits.remove(bits));
    }

    /// Currently set bits
    pub fn snapshot(&self) -> Signals {
        self.state.lock(|state| state.borrow().bits)
    }

    /// Non-blocking wait
    ///
    /// Returns the matched bits if the condition already holds.
    pub fn try_take(&self, bits: Signals, wait_for: WaitFor, clear: ClearMode) -> Option<Signals> {
        self.state
            .lock(|state| state.borrow_mut().take(bits, wait_for, clear))
    }

    /// Wait until `bits` satisfy `wait_for`
    ///
    /// Resolves to the matched subset of `bits`. Task context only.
    pub async fn wait(&self, bits: Signals, wait_for: WaitFor, clear: ClearMode) -> Signals {
        debug_assert!(!bits.is_empty(), "waiting on an empty signal mask");
        poll_fn(|cx| self.poll_wait(cx, bits, wait_for, clear)).await
    }

    /// Poll form of [`SignalBus::wait`]
    pub fn poll_wait(
        &self,
        cx: &mut Context<'_>,
        bits: Signals,
        wait_for: WaitFor,
        clear: ClearMode,
    ) -> Poll<Signals> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            match state.take(bits, wait_for, clear) {
                Some(hit) => Poll::Ready(hit),
                None => {
                    state.waiters.register(cx.waker());
                    Poll::Pending
                }
            }
        })
    }
}
