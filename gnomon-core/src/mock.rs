//! Recording hardware fakes for host tests

extern crate std;

use core::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

use gnomon_hal::{
    BulkEngine, CountdownTimer, EngineStatus, InterruptGate, IrqLine, Level, OutputPin,
    PwmChannel, SpiChannel,
};

use crate::status::{ChannelRelease, TimerExpiry};

/// Hardware call, in the order it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwEvent {
    Byte(u8),
    Dc(Level),
    Cs(Level),
    PollTxEmpty,
    PollBusy,
    TxDma(bool),
    ErrorIrq(bool),
    OverrunCleared(bool),
    EngineStart(usize),
    EngineFinish,
    TimerStart(u32),
    TimerStop,
    TimerAck,
    PwmEnable,
    Duty(u16),
    IrqEnable(IrqLine),
    IrqDisable(IrqLine),
}

impl HwEvent {
    fn is_poll(&self) -> bool {
        matches!(self, HwEvent::PollTxEmpty | HwEvent::PollBusy)
    }
}

/// Shared event log; clones append to the same log
#[derive(Debug, Clone, Default)]
pub struct HwLog(Rc<RefCell<Vec<HwEvent>>>);

impl HwLog {
    pub fn push(&self, event: HwEvent) {
        self.0.borrow_mut().push(event);
    }

    /// Every event, register polls included
    pub fn raw(&self) -> Vec<HwEvent> {
        self.0.borrow().clone()
    }

    /// Events without register polls
    pub fn events(&self) -> Vec<HwEvent> {
        self.0.borrow().iter().copied().filter(|e| !e.is_poll()).collect()
    }

    /// Bytes written to the data register
    pub fn bytes(&self) -> Vec<u8> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HwEvent::Byte(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    /// Bytes paired with the control line level they were sent at
    pub fn wire(&self) -> Vec<(Level, u8)> {
        let mut dc = Level::Low;
        let mut out = Vec::new();
        for event in self.0.borrow().iter() {
            match *event {
                HwEvent::Dc(level) => dc = level,
                HwEvent::Byte(b) => out.push((dc, b)),
                _ => {}
            }
        }
        out
    }

    pub fn count(&self, event: HwEvent) -> usize {
        self.0.borrow().iter().filter(|e| **e == event).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Serial channel fake
pub struct FakeSpi {
    log: HwLog,
    busy_polls: Cell<u32>,
    stuck_busy: bool,
    overrun: bool,
}

impl FakeSpi {
    pub fn new(log: &HwLog) -> Self {
        Self {
            log: log.clone(),
            busy_polls: Cell::new(0),
            stuck_busy: false,
            overrun: false,
        }
    }

    /// Report busy for the next `polls` reads
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = Cell::new(polls);
        self
    }

    pub fn stuck_busy(mut self) -> Self {
        self.stuck_busy = true;
        self
    }

    pub fn with_overrun(mut self) -> Self {
        self.overrun = true;
        self
    }
}

impl SpiChannel for FakeSpi {
    fn write_byte(&mut self, byte: u8) {
        self.log.push(HwEvent::Byte(byte));
    }

    fn is_tx_empty(&self) -> bool {
        self.log.push(HwEvent::PollTxEmpty);
        true
    }

    fn is_busy(&self) -> bool {
        self.log.push(HwEvent::PollBusy);
        if self.stuck_busy {
            return true;
        }
        let left = self.busy_polls.get();
        if left > 0 {
            self.busy_polls.set(left - 1);
            true
        } else {
            false
        }
    }

    fn enable_tx_dma(&mut self) {
        self.log.push(HwEvent::TxDma(true));
    }

    fn disable_tx_dma(&mut self) {
        self.log.push(HwEvent::TxDma(false));
    }

    fn enable_error_interrupt(&mut self) {
        self.log.push(HwEvent::ErrorIrq(true));
    }

    fn disable_error_interrupt(&mut self) {
        self.log.push(HwEvent::ErrorIrq(false));
    }

    fn clear_overrun(&mut self) -> bool {
        let was = core::mem::take(&mut self.overrun);
        self.log.push(HwEvent::OverrunCleared(was));
        was
    }
}

/// Bulk engine fake
///
/// With a release handle it frees the channel as soon as it is armed,
/// standing in for an interrupt that fires immediately.
pub struct FakeEngine<'a> {
    log: HwLog,
    status: EngineStatus,
    release: Option<ChannelRelease<'a>>,
}

impl<'a> FakeEngine<'a> {
    pub fn new(log: &HwLog) -> Self {
        Self {
            log: log.clone(),
            status: EngineStatus::Complete,
            release: None,
        }
    }

    pub fn completing(log: &HwLog, release: ChannelRelease<'a>) -> Self {
        Self {
            release: Some(release),
            ..Self::new(log)
        }
    }

    pub fn failing(mut self) -> Self {
        self.status = EngineStatus::Error;
        self
    }
}

impl BulkEngine for FakeEngine<'_> {
    #[allow(unsafe_code)]
    unsafe fn start(&mut self, src: &[u8]) {
        self.log.push(HwEvent::EngineStart(src.len()));
        for &b in src {
            self.log.push(HwEvent::Byte(b));
        }
        if let Some(release) = &self.release {
            release.release();
        }
    }

    fn finish(&mut self) -> EngineStatus {
        self.log.push(HwEvent::EngineFinish);
        self.status
    }
}

/// Countdown timer fake
///
/// An expiring timer marks itself expired the moment it starts.
pub struct FakeTimer<'a, const HZ: u32, const MAX: u32> {
    log: HwLog,
    expiry: Option<TimerExpiry<'a>>,
}

pub type CoarseTimer<'a> = FakeTimer<'a, 2048, 65_536>;
pub type FineTimer<'a> = FakeTimer<'a, 1_000_000, 65_535>;

impl<'a, const HZ: u32, const MAX: u32> FakeTimer<'a, HZ, MAX> {
    pub fn silent(log: &HwLog) -> Self {
        Self {
            log: log.clone(),
            expiry: None,
        }
    }

    pub fn expiring(log: &HwLog, expiry: TimerExpiry<'a>) -> Self {
        Self {
            log: log.clone(),
            expiry: Some(expiry),
        }
    }
}

impl<const HZ: u32, const MAX: u32> CountdownTimer for FakeTimer<'_, HZ, MAX> {
    const TICK_HZ: u32 = HZ;
    const MAX_TICKS: u32 = MAX;

    fn start(&mut self, ticks: u32) {
        self.log.push(HwEvent::TimerStart(ticks));
        if let Some(expiry) = &self.expiry {
            expiry.expire();
        }
    }

    fn stop(&mut self) {
        self.log.push(HwEvent::TimerStop);
    }

    fn acknowledge(&mut self) {
        self.log.push(HwEvent::TimerAck);
    }
}

/// Which control line a [`FakePin`] drives
#[derive(Debug, Clone, Copy)]
pub enum PinRole {
    Dc,
    Cs,
}

pub struct FakePin {
    log: HwLog,
    role: PinRole,
}

impl FakePin {
    pub fn new(log: &HwLog, role: PinRole) -> Self {
        Self {
            log: log.clone(),
            role,
        }
    }

    fn record(&self, level: Level) {
        self.log.push(match self.role {
            PinRole::Dc => HwEvent::Dc(level),
            PinRole::Cs => HwEvent::Cs(level),
        });
    }
}

impl OutputPin for FakePin {
    fn set_high(&mut self) {
        self.record(Level::High);
    }

    fn set_low(&mut self) {
        self.record(Level::Low);
    }
}

pub struct FakePwm {
    log: HwLog,
}

impl FakePwm {
    pub fn new(log: &HwLog) -> Self {
        Self { log: log.clone() }
    }
}

impl PwmChannel for FakePwm {
    fn enable(&mut self) {
        self.log.push(HwEvent::PwmEnable);
    }

    fn set_duty(&mut self, duty: u16) {
        self.log.push(HwEvent::Duty(duty));
    }

    fn max_duty(&self) -> u16 {
        2047
    }
}

pub struct FakeGate {
    log: HwLog,
}

impl FakeGate {
    pub fn new(log: &HwLog) -> Self {
        Self { log: log.clone() }
    }
}

impl InterruptGate for FakeGate {
    fn enable(&mut self, line: IrqLine) {
        self.log.push(HwEvent::IrqEnable(line));
    }

    fn disable(&mut self, line: IrqLine) {
        self.log.push(HwEvent::IrqDisable(line));
    }
}
