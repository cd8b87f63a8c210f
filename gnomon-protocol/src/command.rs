//! Controller opcodes and instruction builders
//!
//! Everything the watch sends to the panel is one of: a fixed code table,
//! an area-select window, or a scan-direction change.

use crate::frame::{CodeTable, FrameError, TransmissionFrame};

/// Panel width in pixels
pub const PANEL_WIDTH: u16 = 240;

/// Panel height in pixels
pub const PANEL_HEIGHT: u16 = 240;

/// Controller command opcodes
pub mod opcode {
    pub const SLEEP_IN: u8 = 0x10;
    pub const SLEEP_OUT: u8 = 0x11;
    pub const INVERSION_ON: u8 = 0x21;
    pub const DISPLAY_OFF: u8 = 0x28;
    pub const DISPLAY_ON: u8 = 0x29;
    pub const COLUMN_ADDRESS_SET: u8 = 0x2A;
    pub const ROW_ADDRESS_SET: u8 = 0x2B;
    pub const MEMORY_WRITE: u8 = 0x2C;
    pub const TEARING_EFFECT_ON: u8 = 0x35;
    pub const MEMORY_ACCESS_CONTROL: u8 = 0x36;
    pub const PIXEL_FORMAT_SET: u8 = 0x3A;

    /// Pixel format parameter for 16 bits per pixel
    pub const PIXEL_FORMAT_RGB565: u8 = 0x05;
}

const C: u8 = crate::frame::TAG_COMMAND;
const D: u8 = crate::frame::TAG_DATA;

/// Vendor power-up sequence
///
/// Leaves the controller awake, inverted, RGB565, with the tearing output
/// enabled. The caller must wait 120 ms before sending [`DISPLAY_ON`].
#[rustfmt::skip]
pub const INIT_SEQUENCE: CodeTable<'static> = CodeTable::new(&[
    C, 1, 0x36,             D, 1, 0xC8,
    C, 2, 0xEF, 0xEB,       D, 1, 0x14,
    C, 3, 0xFE, 0xEF, 0xEB, D, 1, 0x14,
    C, 1, 0x84, D, 1, 0x40,
    C, 1, 0x85, D, 1, 0xFF,
    C, 1, 0x86, D, 1, 0xFF,
    C, 1, 0x87, D, 1, 0xFF,
    C, 1, 0x88, D, 1, 0x0A,
    C, 1, 0x89, D, 1, 0x21,
    C, 1, 0x8A, D, 1, 0x00,
    C, 1, 0x8B, D, 1, 0x80,
    C, 1, 0x8C, D, 1, 0x01,
    C, 1, 0x8D, D, 1, 0x01,
    C, 1, 0x8E, D, 1, 0xFF,
    C, 1, 0x8F, D, 1, 0xFF,
    C, 1, 0xB6, D, 2, 0x00, 0x20,
    C, 1, 0x36, D, 1, 0xC8,
    C, 1, 0x3A, D, 1, opcode::PIXEL_FORMAT_RGB565,
    C, 1, 0x90, D, 4, 0x08, 0x08, 0x08, 0x08,
    C, 1, 0xBD, D, 1, 0x06,
    C, 1, 0xBC, D, 1, 0x00,
    C, 1, 0xFF, D, 3, 0x60, 0x01, 0x04,
    C, 1, 0xC3, D, 1, 0x13,
    C, 1, 0xC4, D, 1, 0x13,
    C, 1, 0xC9, D, 1, 0x22,
    C, 1, 0xBE, D, 1, 0x11,
    C, 1, 0xE1, D, 2, 0x10, 0x0E,
    C, 1, 0xDF, D, 3, 0x21, 0x0C, 0x02,
    // Gamma
    C, 1, 0xF0, D, 6, 0x45, 0x09, 0x08, 0x08, 0x26, 0x2A,
    C, 1, 0xF1, D, 6, 0x43, 0x70, 0x72, 0x36, 0x37, 0x6F,
    C, 1, 0xF2, D, 6, 0x45, 0x09, 0x08, 0x08, 0x26, 0x2A,
    C, 1, 0xF3, D, 6, 0x43, 0x70, 0x72, 0x36, 0x37, 0x6F,
    C, 1, 0xED, D, 2, 0x1B, 0x0B,
    C, 1, 0xAE, D, 1, 0x77,
    C, 1, 0xCD, D, 1, 0x63,
    C, 1, 0x70, D, 9, 0x07, 0x07, 0x04, 0x0E, 0x0F, 0x09, 0x07, 0x08, 0x03,
    C, 1, 0xE8, D, 1, 0x34,
    C, 1, 0x62, D, 12, 0x18, 0x0D, 0x71, 0xED, 0x70, 0x70, 0x18, 0x0F, 0x71, 0xEF, 0x70, 0x70,
    C, 1, 0x63, D, 12, 0x18, 0x11, 0x71, 0xF1, 0x70, 0x70, 0x18, 0x13, 0x71, 0xF3, 0x70, 0x70,
    C, 1, 0x64, D, 7, 0x28, 0x29, 0xF1, 0x01, 0xF1, 0x00, 0x07,
    C, 1, 0x66, D, 10, 0x3C, 0x00, 0xCD, 0x67, 0x45, 0x45, 0x10, 0x00, 0x00, 0x00,
    C, 1, 0x67, D, 10, 0x00, 0x3C, 0x00, 0x00, 0x00, 0x01, 0x54, 0x10, 0x32, 0x98,
    C, 1, 0x74, D, 7, 0x10, 0x85, 0x80, 0x00, 0x00, 0x4E, 0x00,
    C, 1, 0x98, D, 2, 0x3E, 0x07,
    C, 3, opcode::TEARING_EFFECT_ON, opcode::INVERSION_ON, opcode::SLEEP_OUT,
]);

/// Display on
pub const DISPLAY_ON: CodeTable<'static> = CodeTable::new(&[C, 1, opcode::DISPLAY_ON]);

/// Display off (panel keeps its memory)
pub const DISPLAY_OFF: CodeTable<'static> = CodeTable::new(&[C, 1, opcode::DISPLAY_OFF]);

/// Enter sleep
pub const SLEEP_IN: CodeTable<'static> = CodeTable::new(&[C, 1, opcode::SLEEP_IN]);

/// Leave sleep (wait 120 ms before the next command)
pub const SLEEP_OUT: CodeTable<'static> = CodeTable::new(&[C, 1, opcode::SLEEP_OUT]);

/// Inclusive pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Area {
    x0: u16,
    y0: u16,
    x1: u16,
    y1: u16,
}

impl Area {
    /// Build an area from inclusive corners
    ///
    /// Returns `None` if a start coordinate lies past its end.
    pub const fn new(x0: u16, y0: u16, x1: u16, y1: u16) -> Option<Self> {
        if x0 > x1 || y0 > y1 {
            None
        } else {
            Some(Self { x0, y0, x1, y1 })
        }
    }

    /// Whole panel of the given size
    pub const fn full(width: u16, height: u16) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: width.saturating_sub(1),
            y1: height.saturating_sub(1),
        }
    }

    /// Top-left corner `(x, y)`
    pub const fn start(&self) -> (u16, u16) {
        (self.x0, self.y0)
    }

    /// Bottom-right corner `(x, y)`, inclusive
    pub const fn end(&self) -> (u16, u16) {
        (self.x1, self.y1)
    }

    /// Columns covered
    pub const fn width(&self) -> u32 {
        (self.x1 - self.x0) as u32 + 1
    }

    /// Rows covered
    pub const fn height(&self) -> u32 {
        (self.y1 - self.y0) as u32 + 1
    }

    /// Pixels covered
    ///
    /// A full `u16` x `u16` area does not fit in `u32`.
    pub const fn pixel_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// True if the area lies inside a `width` x `height` panel
    pub const fn fits(&self, width: u16, height: u16) -> bool {
        self.x1 < width && self.y1 < height
    }
}

/// Encoded column/row window for an [`Area`]
///
/// Owns the parameter bytes so the frame can borrow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaWindow {
    column: [u8; 4],
    row: [u8; 4],
}

impl AreaWindow {
    /// Encode start/end pairs, most significant byte first
    pub fn new(area: &Area) -> Self {
        let [x0h, x0l] = area.x0.to_be_bytes();
        let [x1h, x1l] = area.x1.to_be_bytes();
        let [y0h, y0l] = area.y0.to_be_bytes();
        let [y1h, y1l] = area.y1.to_be_bytes();
        Self {
            column: [x0h, x0l, x1h, x1l],
            row: [y0h, y0l, y1h, y1l],
        }
    }

    /// Column set, row set, then memory write
    ///
    /// Pixel data sent after this frame lands in the window, row by row.
    pub fn frame(&self) -> Result<TransmissionFrame<'_>, FrameError> {
        let mut frame = TransmissionFrame::new();
        frame.push_command(&[opcode::COLUMN_ADDRESS_SET])?;
        frame.push_data(&self.column)?;
        frame.push_command(&[opcode::ROW_ADDRESS_SET])?;
        frame.push_data(&self.row)?;
        frame.push_command(&[opcode::MEMORY_WRITE])?;
        Ok(frame)
    }
}

/// Pixel scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanDirection {
    /// Left to right, top to bottom
    #[default]
    Normal,
    /// Right to left, bottom to top
    Rotated,
}

impl ScanDirection {
    /// Map a numeric scan mode (0 = normal, anything else = rotated)
    pub const fn from_mode(mode: u8) -> Self {
        if mode == 0 {
            ScanDirection::Normal
        } else {
            ScanDirection::Rotated
        }
    }

    /// Memory access control parameter (BGR order always set)
    pub const fn madctl(self) -> u8 {
        match self {
            ScanDirection::Normal => 0x08,
            ScanDirection::Rotated => 0xC8,
        }
    }
}

/// Encoded scan-direction instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFrame {
    param: [u8; 1],
}

impl ScanFrame {
    pub const fn new(direction: ScanDirection) -> Self {
        Self {
            param: [direction.madctl()],
        }
    }

    pub fn frame(&self) -> Result<TransmissionFrame<'_>, FrameError> {
        let mut frame = TransmissionFrame::new();
        frame.push_command(&[opcode::MEMORY_ACCESS_CONTROL])?;
        frame.push_data(&self.param)?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Segment, SegmentKind};

    #[test]
    fn test_init_sequence_is_well_formed() {
        let count = INIT_SEQUENCE.validate().unwrap();
        assert!(count > 80);

        let last = INIT_SEQUENCE.segments().last().unwrap().unwrap();
        assert_eq!(last.kind, SegmentKind::Command);
        assert_eq!(last.payload, &[0x35, 0x21, 0x11]);
    }

    #[test]
    fn test_init_sequence_sets_rgb565() {
        let mut segments = INIT_SEQUENCE.segments().map(|s| s.unwrap());
        let pos = segments
            .position(|s| s == Segment::command(&[opcode::PIXEL_FORMAT_SET]))
            .unwrap();
        let param = INIT_SEQUENCE.segments().nth(pos + 1).unwrap().unwrap();
        assert_eq!(param, Segment::data(&[opcode::PIXEL_FORMAT_RGB565]));
    }

    #[test]
    fn test_area_rejects_inverted_corners() {
        assert!(Area::new(10, 0, 9, 5).is_none());
        assert!(Area::new(0, 6, 9, 5).is_none());
        assert!(Area::new(9, 5, 9, 5).is_some());
    }

    #[test]
    fn test_area_pixel_count() {
        let area = Area::new(10, 20, 19, 24).unwrap();
        assert_eq!(area.width(), 10);
        assert_eq!(area.height(), 5);
        assert_eq!(area.pixel_count(), 50);

        let full = Area::full(PANEL_WIDTH, PANEL_HEIGHT);
        assert_eq!(full.pixel_count(), 240 * 240);
        assert!(full.fits(PANEL_WIDTH, PANEL_HEIGHT));
        assert!(!Area::new(0, 0, 240, 10).unwrap().fits(PANEL_WIDTH, PANEL_HEIGHT));
    }

    #[test]
    fn test_area_pixel_count_full_range() {
        let area = Area::new(0, 0, u16::MAX, u16::MAX).unwrap();
        assert_eq!(area.width(), 65_536);
        assert_eq!(area.pixel_count(), 1 << 32);
    }

    #[test]
    fn test_area_window_frame() {
        let window = AreaWindow::new(&Area::new(0, 16, 239, 300).unwrap());
        let frame = window.frame().unwrap();

        assert_eq!(frame.len(), 5);
        assert_eq!(frame.segments()[0], Segment::command(&[0x2A]));
        assert_eq!(frame.segments()[1], Segment::data(&[0x00, 0x00, 0x00, 0xEF]));
        assert_eq!(frame.segments()[2], Segment::command(&[0x2B]));
        assert_eq!(frame.segments()[3], Segment::data(&[0x00, 0x10, 0x01, 0x2C]));
        assert_eq!(frame.segments()[4], Segment::command(&[0x2C]));
    }

    #[test]
    fn test_scan_direction() {
        assert_eq!(ScanDirection::from_mode(0), ScanDirection::Normal);
        assert_eq!(ScanDirection::from_mode(1), ScanDirection::Rotated);

        let scan = ScanFrame::new(ScanDirection::Rotated);
        let frame = scan.frame().unwrap();
        assert_eq!(frame.segments()[0], Segment::command(&[0x36]));
        assert_eq!(frame.segments()[1], Segment::data(&[0xC8]));
        assert_eq!(ScanDirection::Normal.madctl(), 0x08);
    }
}
