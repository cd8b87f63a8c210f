//! SPI channel register access
//!
//! The bus itself (pins, clock, baud rate) is brought up with
//! `embassy_stm32::spi::Spi`; this type only touches the status and control
//! bits the display transport needs, so a second copy can live in the DMA
//! completion handler.

use embassy_stm32::pac;
use gnomon_hal::SpiChannel;

/// Register handle for one SPI peripheral (SPI v1 register layout)
#[derive(Clone, Copy)]
pub struct SpiRegs {
    regs: pac::spi::Spi,
}

impl SpiRegs {
    /// Display channel on the watch board
    pub const fn spi2() -> Self {
        Self { regs: pac::SPI2 }
    }

    /// Data register address, used as the bulk engine destination
    pub fn data_register(&self) -> u32 {
        self.regs.dr().as_ptr() as u32
    }
}

impl SpiChannel for SpiRegs {
    fn write_byte(&mut self, byte: u8) {
        self.regs.dr().write(|w| w.set_dr(byte as u16));
    }

    fn is_tx_empty(&self) -> bool {
        self.regs.sr().read().txe()
    }

    fn is_busy(&self) -> bool {
        self.regs.sr().read().bsy()
    }

    fn enable_tx_dma(&mut self) {
        self.regs.cr2().modify(|w| w.set_txdmaen(true));
    }

    fn disable_tx_dma(&mut self) {
        self.regs.cr2().modify(|w| w.set_txdmaen(false));
    }

    fn enable_error_interrupt(&mut self) {
        self.regs.cr2().modify(|w| w.set_errie(true));
    }

    fn disable_error_interrupt(&mut self) {
        self.regs.cr2().modify(|w| w.set_errie(false));
    }

    fn clear_overrun(&mut self) -> bool {
        let overrun = self.regs.sr().read().ovr();
        // OVR clears on a data register read followed by a status read
        let _ = self.regs.dr().read();
        let _ = self.regs.sr().read();
        overrun
    }
}
