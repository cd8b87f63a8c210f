//! Interrupt dispatch
//!
//! Board interrupt handlers call into [`IsrDispatch`], which owns the ISR
//! side of the shared status and turns each hardware event into status
//! updates, signal bus posts, and deferred gating requests. Hardware cause
//! flags are always cleared before anything is published.

use gnomon_hal::{BulkEngine, CountdownTimer, InterruptGate, IrqLine, SpiChannel};

use crate::console::{ConsoleBuffer, PushOutcome};
use crate::display::complete_transfer;
use crate::interrupt::{GateOp, SharedDeferredQueue, DEFERRED_CAPACITY};
use crate::signal::{SignalBus, Signals};
use crate::status::{ChannelFault, IsrSide, SchedulerState, TimerExpiry};
use crate::timing::TimerId;

/// Default button debounce, ms
pub const DEFAULT_DEBOUNCE_MS: u32 = 50;

/// Front-panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Middle,
    Left,
    Right,
}

impl Button {
    pub const fn signal(self) -> Signals {
        match self {
            Button::Middle => Signals::BUTTON_M,
            Button::Left => Signals::BUTTON_L,
            Button::Right => Signals::BUTTON_R,
        }
    }
}

/// Peripheral interrupt lines that only hand off to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputSource {
    ImuInt1,
    ImuInt2,
    ImuTransferComplete,
    Touch,
    RtcAlarm,
}

impl InputSource {
    pub const fn signal(self) -> Signals {
        match self {
            InputSource::ImuInt1 => Signals::IMU_INT1,
            InputSource::ImuInt2 => Signals::IMU_INT2,
            InputSource::ImuTransferComplete => Signals::IMU_TX_COMPLETE,
            InputSource::Touch => Signals::TOUCH,
            InputSource::RtcAlarm => Signals::RTC_RESYNC,
        }
    }
}

/// ISR-side entry points
pub struct IsrDispatch<'a, const N: usize = DEFERRED_CAPACITY> {
    side: IsrSide<'a>,
    deferred: &'a SharedDeferredQueue<N>,
    debounce_ms: u32,
}

impl<'a, const N: usize> IsrDispatch<'a, N> {
    pub fn new(side: IsrSide<'a>, deferred: &'a SharedDeferredQueue<N>) -> Self {
        Self {
            side,
            deferred,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    pub fn with_debounce(mut self, debounce_ms: u32) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn signals(&self) -> &'a SignalBus {
        self.side.signals
    }

    pub fn scheduler(&self) -> &'a SchedulerState {
        self.side.scheduler
    }

    fn expiry(&self, id: TimerId) -> &TimerExpiry<'a> {
        match id {
            TimerId::Coarse => &self.side.coarse,
            TimerId::Fine => &self.side.fine,
        }
    }

    /// Timer update interrupt
    ///
    /// The expired flag is always set, for spin waits before the scheduler
    /// starts. The bus bit is only posted once it runs.
    pub fn timer_expired<T: CountdownTimer>(&self, id: TimerId, timer: &mut T) {
        timer.acknowledge();
        timer.stop();
        self.expiry(id).expire();
        if self.side.scheduler.is_running() {
            self.side.signals.post(id.signal());
        }
    }

    /// Bulk engine completion interrupt for the display channel
    pub fn transfer_complete<S: SpiChannel, E: BulkEngine>(
        &self,
        spi: &mut S,
        engine: &mut E,
    ) -> ChannelFault {
        complete_transfer(
            spi,
            engine,
            &self.side.display,
            self.side.signals,
            self.side.scheduler,
        )
    }

    /// Button edge interrupt
    ///
    /// Masks the button's line, queues its re-enable after the debounce
    /// interval, and posts the button bit. If the deferred queue is full the
    /// line is re-enabled at once, giving up debouncing for this press.
    /// Returns whether the re-enable was queued.
    ///
    /// `now` is the wrapping millisecond clock the drain task retires against.
    pub fn button_pressed<G: InterruptGate>(
        &self,
        button: Button,
        line: IrqLine,
        now: u32,
        gate: &mut G,
    ) -> bool {
        gate.disable(line);
        let deadline = now.wrapping_add(self.debounce_ms);
        let queued = self.deferred.schedule(line, GateOp::Enable, deadline);
        if !queued {
            #[cfg(feature = "defmt")]
            defmt::warn!("deferred queue full; {} not debounced", button);
            gate.enable(line);
        }
        self.side.signals.post(button.signal());
        queued
    }

    /// Sensor, touch, or RTC interrupt
    pub fn input(&self, source: InputSource) {
        self.side.signals.post(source.signal());
    }

    /// Console receive interrupt
    pub fn console_byte<const M: usize>(&self, byte: u8, console: &ConsoleBuffer<M>) -> PushOutcome {
        let outcome = console.push(byte);
        if outcome == PushOutcome::LineReady {
            self.side.signals.post(Signals::CONSOLE_INPUT);
        }
        outcome
    }
}
