//! Blocking and bulk senders for the display channel
//!
//! Small control frames go out byte by byte, polling the transmit-empty
//! flag. Pixel data goes out through the bulk engine when the scheduler is
//! running: the channel is claimed, the engine armed, and the caller waits
//! for the completion interrupt to release the channel again.

use core::hint::spin_loop;

use gnomon_hal::dma::MAX_TRANSFER_LEN;
use gnomon_hal::{BulkEngine, SpiChannel};
use gnomon_protocol::FrameError;

use crate::signal::{ClearMode, SignalBus, Signals, WaitFor};
use crate::status::{ChannelClaim, ChannelFault, SchedulerState};

/// Polls allowed for the shift register to go idle
pub const BUSY_SPIN_LIMIT: u32 = 1000;

/// Smallest payload worth arming the bulk engine for
pub const DEFAULT_BULK_THRESHOLD: usize = 64;

/// Display transmission errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitError {
    /// A bulk transfer is still outstanding on the channel
    Busy,
    /// Nothing to send (empty buffer or zero repeat count)
    EmptyPayload,
    /// Area corners inverted or outside the panel
    InvalidArea,
    /// Pixel buffer does not match the area
    LengthMismatch,
    /// The settle timer was already counting
    TimerBusy,
    /// Malformed frame or code table
    Frame(FrameError),
}

impl From<FrameError> for TransmitError {
    fn from(e: FrameError) -> Self {
        TransmitError::Frame(e)
    }
}

/// Which sender a payload goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendStrategy {
    Blocking,
    Bulk,
}

impl SendStrategy {
    /// Bulk only pays off once tasks can run while the engine works
    pub fn select(scheduler_running: bool, len: usize, bulk_threshold: usize) -> Self {
        if scheduler_running && len >= bulk_threshold {
            SendStrategy::Bulk
        } else {
            SendStrategy::Blocking
        }
    }
}

/// Spin until `done` holds, at most [`BUSY_SPIN_LIMIT`] polls
pub(crate) fn spin_until(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..BUSY_SPIN_LIMIT {
        if done() {
            return true;
        }
        spin_loop();
    }
    done()
}

/// Holds the channel claim while the engine may still read the buffer
///
/// Dropping it waits for the completion interrupt, so an abandoned send
/// never frees a buffer the engine is reading.
struct InFlight<'c, 'a> {
    channel: &'c ChannelClaim<'a>,
}

impl Drop for InFlight<'_, '_> {
    fn drop(&mut self) {
        while !self.channel.is_idle() {
            spin_loop();
        }
    }
}

/// Sender pair over one serial channel
pub struct DisplayTransport<'a, S, E> {
    spi: S,
    engine: E,
    channel: ChannelClaim<'a>,
    signals: &'a SignalBus,
    scheduler: &'a SchedulerState,
    bulk_threshold: usize,
}

impl<'a, S: SpiChannel, E: BulkEngine> DisplayTransport<'a, S, E> {
    pub fn new(
        spi: S,
        engine: E,
        channel: ChannelClaim<'a>,
        signals: &'a SignalBus,
        scheduler: &'a SchedulerState,
    ) -> Self {
        Self {
            spi,
            engine,
            channel,
            signals,
            scheduler,
            bulk_threshold: DEFAULT_BULK_THRESHOLD,
        }
    }

    pub fn with_bulk_threshold(mut self, bytes: usize) -> Self {
        self.bulk_threshold = bytes.max(1);
        self
    }

    pub fn is_idle(&self) -> bool {
        self.channel.is_idle()
    }

    pub fn scheduler(&self) -> &'a SchedulerState {
        self.scheduler
    }

    /// Read and clear the fault recorded by the last completion
    pub fn take_fault(&self) -> ChannelFault {
        self.channel.take_fault()
    }

    pub fn strategy_for(&self, len: usize) -> SendStrategy {
        SendStrategy::select(self.scheduler.is_running(), len, self.bulk_threshold)
    }

    /// Write `bytes` `repeat` times, polling between bytes
    ///
    /// Returns once the last byte has left the shift register.
    pub fn send_blocking(&mut self, bytes: &[u8], repeat: u32) -> Result<(), TransmitError> {
        if bytes.is_empty() || repeat == 0 {
            return Err(TransmitError::EmptyPayload);
        }
        if !self.channel.is_idle() {
            return Err(TransmitError::Busy);
        }

        for _ in 0..repeat {
            for &byte in bytes {
                while !self.spi.is_tx_empty() {
                    spin_loop();
                }
                self.spi.write_byte(byte);
            }
        }

        while !self.spi.is_tx_empty() {
            spin_loop();
        }
        let spi = &self.spi;
        if !spin_until(|| !spi.is_busy()) {
            #[cfg(feature = "defmt")]
            defmt::warn!("display channel still busy after blocking send");
        }
        Ok(())
    }

    /// Stream `bytes` `repeat` times through the bulk engine
    ///
    /// One repetition is in flight at a time. Buffers longer than the engine
    /// can cover are split. Fails with [`TransmitError::Busy`], arming
    /// nothing, if a transfer is already outstanding.
    pub async fn send_bulk(&mut self, bytes: &[u8], repeat: u32) -> Result<(), TransmitError> {
        if bytes.is_empty() || repeat == 0 {
            return Err(TransmitError::EmptyPayload);
        }
        if !self.channel.try_claim() {
            return Err(TransmitError::Busy);
        }

        let mut claimed = true;
        for _ in 0..repeat {
            for chunk in bytes.chunks(MAX_TRANSFER_LEN) {
                if !claimed && !self.channel.try_claim() {
                    return Err(TransmitError::Busy);
                }
                claimed = false;
                self.transfer_chunk(chunk).await;
            }
        }
        Ok(())
    }

    /// Send pixel data through whichever sender suits its size
    pub async fn send_pixels(&mut self, bytes: &[u8], repeat: u32) -> Result<(), TransmitError> {
        match self.strategy_for(bytes.len()) {
            SendStrategy::Blocking => self.send_blocking(bytes, repeat),
            SendStrategy::Bulk => self.send_bulk(bytes, repeat).await,
        }
    }

    /// Arm one chunk on a claimed channel and wait for its release
    #[allow(unsafe_code)]
    async fn transfer_chunk(&mut self, chunk: &[u8]) {
        let signals = self.signals;
        let cooperative = self.scheduler.is_running();
        if cooperative {
            signals.clear(Signals::TRANSFER_COMPLETE);
        }

        let in_flight = InFlight {
            channel: &self.channel,
        };
        // SAFETY: `chunk` stays borrowed until `in_flight` is dropped, and
        // dropping it waits for the completion interrupt to release the
        // channel after tearing the engine down.
        unsafe { self.engine.start(chunk) };
        self.spi.enable_error_interrupt();
        self.spi.enable_tx_dma();

        if cooperative {
            while !in_flight.channel.is_idle() {
                signals
                    .wait(Signals::TRANSFER_COMPLETE, WaitFor::Any, ClearMode::Auto)
                    .await;
            }
        }
        drop(in_flight);
    }
}
