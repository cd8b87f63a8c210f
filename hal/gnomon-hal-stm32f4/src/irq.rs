//! NVIC interrupt gating

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use embassy_stm32::pac::Interrupt;
use gnomon_hal::{InterruptGate, IrqLine};

use crate::gpio;

#[derive(Clone, Copy)]
struct Line(u16);

// SAFETY: `Line` only carries numbers taken from the device interrupt enum
unsafe impl InterruptNumber for Line {
    fn number(self) -> u16 {
        self.0
    }
}

/// Line for a device interrupt
pub fn line(irq: Interrupt) -> IrqLine {
    IrqLine(irq.number())
}

/// EXTI line behind a single-line EXTI interrupt
fn exti_line(line: IrqLine) -> Option<usize> {
    const SINGLE: [Interrupt; 5] = [
        Interrupt::EXTI0,
        Interrupt::EXTI1,
        Interrupt::EXTI2,
        Interrupt::EXTI3,
        Interrupt::EXTI4,
    ];
    SINGLE.iter().position(|irq| irq.number() == line.number())
}

/// Masks and unmasks lines in the NVIC
///
/// Re-enabling an EXTI line first drops edges latched while it was masked,
/// so contact bounce during a debounce window does not fire late.
#[derive(Default)]
pub struct NvicGate;

impl InterruptGate for NvicGate {
    fn enable(&mut self, line: IrqLine) {
        if let Some(exti) = exti_line(line) {
            gpio::clear_pending(exti);
        }
        NVIC::unpend(Line(line.number()));
        // SAFETY: every line gated here has its handler installed by the
        // firmware before the line is first masked
        unsafe { NVIC::unmask(Line(line.number())) };
    }

    fn disable(&mut self, line: IrqLine) {
        NVIC::mask(Line(line.number()));
    }
}
