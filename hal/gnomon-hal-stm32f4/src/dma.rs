//! DMA stream bulk engine
//!
//! Memory-to-peripheral byte transfers on one stream of a DMA v2 controller
//! (STM32F4).
//!
//! `embassy-stm32` owns every DMA stream vector: its handler acknowledges
//! transfer-complete and wakes the waker registered for the channel, and it
//! panics on a transfer error. Each chunk is therefore started through
//! [`Transfer`], polled once with a waker that calls the board's completion
//! hook, and then left running. The hook runs in the stream interrupt and is
//! expected to call [`BulkEngine::finish`] on a [`DmaStream::isr`] handle.

use core::future::Future;
use core::pin::Pin;
use core::task::Context;

use embassy_stm32::dma::{Request, Transfer, TransferOptions};
use embassy_stm32::pac;
use embassy_stm32::peripherals::DMA1_CH4;
use embassy_stm32::Peri;
use gnomon_hal::dma::{hook_waker, CompletionHook, MAX_TRANSFER_LEN};
use gnomon_hal::{BulkEngine, EngineStatus};

/// DMA1 stream 4 request line for SPI2 transmit
const SPI2_TX_REQUEST: Request = 0;

/// Register view of one stream, for flag handling in interrupt context
#[derive(Clone, Copy)]
struct StreamRegs {
    dma: pac::dma::Dma,
    stream: usize,
}

impl StreamRegs {
    const DMA1_STREAM4: Self = Self {
        dma: pac::DMA1,
        stream: 4,
    };

    fn flag_index(&self) -> (usize, usize) {
        (self.stream / 4, self.stream % 4)
    }

    fn clear_flags(&self) {
        let (idx, pos) = self.flag_index();
        self.dma.ifcr(idx).write(|w| {
            w.set_tcif(pos, true);
            w.set_htif(pos, true);
            w.set_teif(pos, true);
            w.set_dmeif(pos, true);
            w.set_feif(pos, true);
        });
    }
}

/// One DMA stream wired to a peripheral data register
pub struct DmaStream {
    regs: StreamRegs,
    channel: Option<Peri<'static, DMA1_CH4>>,
    peripheral: u32,
    on_complete: Option<CompletionHook>,
}

impl DmaStream {
    /// DMA1 stream 4, channel 0: SPI2 transmit
    ///
    /// `on_complete` runs in the stream interrupt after each transfer.
    pub fn dma1_stream4_spi2(
        channel: Peri<'static, DMA1_CH4>,
        peripheral: u32,
        on_complete: CompletionHook,
    ) -> Self {
        Self {
            regs: StreamRegs::DMA1_STREAM4,
            channel: Some(channel),
            peripheral,
            on_complete: Some(on_complete),
        }
    }

    /// Interrupt-context handle for DMA1 stream 4; it can only finish
    pub const fn isr() -> Self {
        Self {
            regs: StreamRegs::DMA1_STREAM4,
            channel: None,
            peripheral: 0,
            on_complete: None,
        }
    }
}

impl BulkEngine for DmaStream {
    unsafe fn start(&mut self, src: &[u8]) {
        debug_assert!(!src.is_empty() && src.len() <= MAX_TRANSFER_LEN);
        let (Some(channel), Some(hook)) = (self.channel.as_mut(), self.on_complete) else {
            debug_assert!(false, "interrupt handle cannot start a transfer");
            return;
        };

        self.regs.clear_flags();
        let waker = hook_waker(hook);
        let mut cx = Context::from_waker(&waker);

        // The stream interrupt stays pending until the hook is registered
        critical_section::with(|_| {
            // SAFETY: `peripheral` is the SPI2 data register, and the caller
            // keeps `src` alive until the hook has run `finish`
            let mut transfer = unsafe {
                Transfer::new_write(
                    channel.reborrow(),
                    SPI2_TX_REQUEST,
                    src,
                    self.peripheral as *mut u8,
                    TransferOptions::default(),
                )
            };
            let _ = Pin::new(&mut transfer).poll(&mut cx);
            // Dropping would abort the stream; the hook ends it instead
            core::mem::forget(transfer);
        });
    }

    fn finish(&mut self) -> EngineStatus {
        let (idx, pos) = self.regs.flag_index();
        let failed = self.regs.dma.isr(idx).read().teif(pos);

        let st = self.regs.dma.st(self.regs.stream);
        st.cr().modify(|w| {
            w.set_tcie(false);
            w.set_teie(false);
            w.set_en(false);
        });
        self.regs.clear_flags();

        if failed {
            EngineStatus::Error
        } else {
            EngineStatus::Complete
        }
    }
}
