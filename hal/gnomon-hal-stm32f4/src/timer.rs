//! One-pulse countdown timers
//!
//! | Type          | Timer | Width  | Tick      |
//! |---------------|-------|--------|-----------|
//! | `CoarseTimer` | TIM2  | 32-bit | 2.048 kHz |
//! | `FineTimer`   | TIM4  | 16-bit | 1 MHz     |
//!
//! `new` enables the clock and sets the prescaler from the timer kernel
//! clock; `isr` gives a bare register handle for the update interrupt.

use embassy_stm32::pac;
use gnomon_hal::CountdownTimer;

fn prescaler(kernel_hz: u32, tick_hz: u32) -> u16 {
    let div = (kernel_hz / tick_hz).clamp(1, u16::MAX as u32 + 1);
    (div - 1) as u16
}

/// Millisecond-range timer on TIM2
pub struct CoarseTimer {
    regs: pac::timer::TimGp32,
}

impl CoarseTimer {
    pub fn new(kernel_hz: u32) -> Self {
        pac::RCC.apb1enr().modify(|w| w.set_tim2en(true));
        let regs = pac::TIM2;
        regs.cr1().modify(|w| w.set_cen(false));
        regs.psc().write_value(prescaler(kernel_hz, Self::TICK_HZ));
        Self { regs }
    }

    pub const fn isr() -> Self {
        Self { regs: pac::TIM2 }
    }
}

impl CountdownTimer for CoarseTimer {
    const TICK_HZ: u32 = 2048;
    const MAX_TICKS: u32 = 65_536;

    fn start(&mut self, ticks: u32) {
        let r = self.regs;
        r.cr1().modify(|w| w.set_cen(false));
        r.arr().write_value(ticks.max(1) - 1);
        // Latch the prescaler; the update flag this raises is cleared below
        r.egr().write(|w| w.set_ug(true));
        r.sr().write(|w| w.set_uif(false));
        r.dier().modify(|w| w.set_uie(true));
        r.cr1().modify(|w| {
            w.set_opm(true);
            w.set_cen(true);
        });
    }

    fn stop(&mut self) {
        self.regs.cr1().modify(|w| w.set_cen(false));
        self.regs.dier().modify(|w| w.set_uie(false));
    }

    fn acknowledge(&mut self) {
        self.regs.sr().write(|w| w.set_uif(false));
    }
}

/// Microsecond-range timer on TIM4
pub struct FineTimer {
    regs: pac::timer::TimGp16,
}

impl FineTimer {
    pub fn new(kernel_hz: u32) -> Self {
        pac::RCC.apb1enr().modify(|w| w.set_tim4en(true));
        let regs = pac::TIM4;
        regs.cr1().modify(|w| w.set_cen(false));
        regs.psc().write_value(prescaler(kernel_hz, Self::TICK_HZ));
        Self { regs }
    }

    pub const fn isr() -> Self {
        Self { regs: pac::TIM4 }
    }
}

impl CountdownTimer for FineTimer {
    const TICK_HZ: u32 = 1_000_000;
    const MAX_TICKS: u32 = 65_535;

    fn start(&mut self, ticks: u32) {
        let r = self.regs;
        let reload = ticks.clamp(1, Self::MAX_TICKS) - 1;
        r.cr1().modify(|w| w.set_cen(false));
        r.arr().write(|w| w.set_arr(reload as u16));
        r.egr().write(|w| w.set_ug(true));
        r.sr().write(|w| w.set_uif(false));
        r.dier().modify(|w| w.set_uie(true));
        r.cr1().modify(|w| {
            w.set_opm(true);
            w.set_cen(true);
        });
    }

    fn stop(&mut self) {
        self.regs.cr1().modify(|w| w.set_cen(false));
        self.regs.dier().modify(|w| w.set_uie(false));
    }

    fn acknowledge(&mut self) {
        self.regs.sr().write(|w| w.set_uif(false));
    }
}
