//! Output pins and external interrupt lines

use embassy_stm32::pac;
use embedded_hal::digital::OutputPin as HalOutputPin;
use gnomon_hal::OutputPin;

/// Adapts an `embedded-hal` output (e.g. `embassy_stm32::gpio::Output`)
pub struct Pin<P>(pub P);

impl<P: HalOutputPin> OutputPin for Pin<P> {
    fn set_high(&mut self) {
        // Output pins on this chip are infallible
        let _ = self.0.set_high();
    }

    fn set_low(&mut self) {
        let _ = self.0.set_low();
    }
}

/// GPIO port index for EXTI source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A = 0,
    B = 1,
    C = 2,
}

/// Route `port`'s pin `line` to EXTI line `line`, falling edge only
///
/// The pin itself must already be configured as an input.
pub fn configure_falling_edge(port: Port, line: usize) {
    pac::RCC.apb2enr().modify(|w| w.set_syscfgen(true));
    pac::SYSCFG
        .exticr(line / 4)
        .modify(|w| w.set_exti(line % 4, port as u8));
    pac::EXTI.rtsr(0).modify(|w| w.set_line(line, false));
    pac::EXTI.ftsr(0).modify(|w| w.set_line(line, true));
    clear_pending(line);
    pac::EXTI.imr(0).modify(|w| w.set_line(line, true));
}

/// Clear a latched edge on `line`
pub fn clear_pending(line: usize) {
    pac::EXTI.pr(0).write(|w| w.set_line(line, true));
}
