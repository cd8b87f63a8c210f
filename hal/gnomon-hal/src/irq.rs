//! Interrupt line gating

/// Interrupt line identifier (the controller's interrupt number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqLine(pub u16);

impl IrqLine {
    /// Raw interrupt number
    pub const fn number(self) -> u16 {
        self.0
    }
}

/// Enables and masks individual interrupt lines
pub trait InterruptGate {
    /// Unmask `line`
    fn enable(&mut self, line: IrqLine);

    /// Mask `line`
    fn disable(&mut self, line: IrqLine);
}

impl<T: InterruptGate + ?Sized> InterruptGate for &mut T {
    fn enable(&mut self, line: IrqLine) {
        (**self).enable(line);
    }

    fn disable(&mut self, line: IrqLine) {
        (**self).disable(line);
    }
}
