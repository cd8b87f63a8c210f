//! Panel controller operations
//!
//! Every operation frames itself with chip select and drives the
//! command/data line per segment: low for command bytes, high for data.

use gnomon_hal::{BulkEngine, CountdownTimer, OutputPin, SpiChannel};
use gnomon_protocol::command::{DISPLAY_OFF, DISPLAY_ON, INIT_SEQUENCE, SLEEP_IN, SLEEP_OUT};
use gnomon_protocol::{
    Area, AreaWindow, CodeTable, Rgb565, ScanDirection, ScanFrame, SegmentKind,
    TransmissionFrame, PANEL_HEIGHT, PANEL_WIDTH,
};

use super::transport::{DisplayTransport, TransmitError};
use crate::timing::{DelayTimer, SleepStatus};

/// Settle time after the power-up table, ms
pub const INIT_SETTLE_MS: u32 = 120;

/// Settle time after switching the panel on, ms
pub const DISPLAY_ON_SETTLE_MS: u32 = 20;

/// Round display panel behind a [`DisplayTransport`]
pub struct Panel<'a, S, E, DC, CS> {
    transport: DisplayTransport<'a, S, E>,
    dc: DC,
    cs: CS,
    width: u16,
    height: u16,
}

impl<'a, S, E, DC, CS> Panel<'a, S, E, DC, CS>
where
    S: SpiChannel,
    E: BulkEngine,
    DC: OutputPin,
    CS: OutputPin,
{
    pub fn new(transport: DisplayTransport<'a, S, E>, dc: DC, mut cs: CS) -> Self {
        cs.set_high();
        Self {
            transport,
            dc,
            cs,
            width: PANEL_WIDTH,
            height: PANEL_HEIGHT,
        }
    }

    pub fn with_size(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn transport(&self) -> &DisplayTransport<'a, S, E> {
        &self.transport
    }

    /// Full-screen area
    pub fn full_area(&self) -> Area {
        Area::full(self.width, self.height)
    }

    /// Send one prepared frame
    pub fn send_frame(&mut self, frame: &TransmissionFrame<'_>) -> Result<(), TransmitError> {
        self.cs.set_low();
        let result = self.write_frame(frame);
        self.cs.set_high();
        result
    }

    /// Send every record of a code table
    ///
    /// The table is checked first, so a malformed one sends nothing.
    pub fn send_table(&mut self, table: CodeTable<'_>) -> Result<(), TransmitError> {
        table.validate()?;
        self.cs.set_low();
        let result = self.write_table(table);
        self.cs.set_high();
        result
    }

    /// Power-up sequence: vendor table, display on, normal scan order
    pub async fn init<T: CountdownTimer>(
        &mut self,
        delay: &mut DelayTimer<'_, T>,
    ) -> Result<(), TransmitError> {
        self.send_table(INIT_SEQUENCE)?;
        settle(delay, INIT_SETTLE_MS).await?;
        self.send_table(DISPLAY_ON)?;
        settle(delay, DISPLAY_ON_SETTLE_MS).await?;
        self.set_scan_direction(ScanDirection::Normal)?;

        #[cfg(feature = "defmt")]
        defmt::info!("panel initialized ({}x{})", self.width, self.height);
        Ok(())
    }

    pub fn display_on(&mut self) -> Result<(), TransmitError> {
        self.send_table(DISPLAY_ON)
    }

    pub fn display_off(&mut self) -> Result<(), TransmitError> {
        self.send_table(DISPLAY_OFF)
    }

    pub fn sleep_in(&mut self) -> Result<(), TransmitError> {
        self.send_table(SLEEP_IN)
    }

    /// Wake the controller; it needs 120 ms before the next command
    pub fn sleep_out(&mut self) -> Result<(), TransmitError> {
        self.send_table(SLEEP_OUT)
    }

    /// Select the window subsequent pixel data is written to
    pub fn select_area(&mut self, area: Area) -> Result<(), TransmitError> {
        self.check_area(&area)?;
        self.cs.set_low();
        let result = self.write_area(&area);
        self.cs.set_high();
        result
    }

    pub fn set_scan_direction(&mut self, direction: ScanDirection) -> Result<(), TransmitError> {
        let scan = ScanFrame::new(direction);
        let frame = scan.frame()?;
        self.send_frame(&frame)
    }

    /// Paint `area` a single color
    pub async fn fill(&mut self, area: Area, color: Rgb565) -> Result<(), TransmitError> {
        self.check_area(&area)?;
        let count = u32::try_from(area.pixel_count()).map_err(|_| TransmitError::InvalidArea)?;
        let pixel = color.to_be_bytes();

        self.cs.set_low();
        let result = match self.write_area(&area) {
            Ok(()) => {
                self.dc.set_high();
                self.transport.send_pixels(&pixel, count).await
            }
            Err(e) => Err(e),
        };
        self.cs.set_high();
        result
    }

    /// Paint the rectangle with corners `(x0, y0)` and `(x1, y1)`, inclusive
    ///
    /// Inverted corners are rejected before anything is sent.
    pub async fn fill_rect(
        &mut self,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
        color: Rgb565,
    ) -> Result<(), TransmitError> {
        let area = Area::new(x0, y0, x1, y1).ok_or(TransmitError::InvalidArea)?;
        self.fill(area, color).await
    }

    /// Write a big-endian RGB565 buffer covering `area` exactly
    pub async fn refresh(&mut self, area: Area, pixels: &[u8]) -> Result<(), TransmitError> {
        self.check_area(&area)?;
        let count = usize::try_from(area.pixel_count()).map_err(|_| TransmitError::InvalidArea)?;
        if pixels.len() != Rgb565::buffer_len(count) {
            return Err(TransmitError::LengthMismatch);
        }

        self.cs.set_low();
        let result = match self.write_area(&area) {
            Ok(()) => {
                self.dc.set_high();
                self.transport.send_pixels(pixels, 1).await
            }
            Err(e) => Err(e),
        };
        self.cs.set_high();
        result
    }

    fn check_area(&self, area: &Area) -> Result<(), TransmitError> {
        if area.fits(self.width, self.height) {
            Ok(())
        } else {
            Err(TransmitError::InvalidArea)
        }
    }

    fn write_area(&mut self, area: &Area) -> Result<(), TransmitError> {
        let window = AreaWindow::new(area);
        let frame = window.frame()?;
        self.write_frame(&frame)
    }

    fn write_frame(&mut self, frame: &TransmissionFrame<'_>) -> Result<(), TransmitError> {
        for segment in frame {
            self.write_segment(segment.kind, segment.payload)?;
        }
        Ok(())
    }

    fn write_table(&mut self, table: CodeTable<'_>) -> Result<(), TransmitError> {
        for segment in table.segments() {
            let segment = segment?;
            self.write_segment(segment.kind, segment.payload)?;
        }
        Ok(())
    }

    fn write_segment(&mut self, kind: SegmentKind, payload: &[u8]) -> Result<(), TransmitError> {
        if kind.is_data() {
            self.dc.set_high();
        } else {
            self.dc.set_low();
        }
        self.transport.send_blocking(payload, 1)
    }
}

async fn settle<T: CountdownTimer>(delay: &mut DelayTimer<'_, T>, ms: u32) -> Result<(), TransmitError> {
    let mode = delay.wait_mode();
    match delay.sleep(ms, mode).await {
        SleepStatus::Done => Ok(()),
        SleepStatus::Busy => Err(TransmitError::TimerBusy),
    }
}
