//! RGB565 pixel encoding

/// 16-bit colour: 5 bits red, 6 bits green, 5 bits blue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Self = Self(0x0000);
    pub const WHITE: Self = Self(0xFFFF);
    pub const RED: Self = Self(0xF800);
    pub const GREEN: Self = Self(0x07E0);
    pub const BLUE: Self = Self(0x001F);

    /// Pack 8-bit channels, dropping the low bits
    pub const fn from_rgb888(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3))
    }

    /// Wire order: high byte first
    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Bytes needed for `pixels` pixels
    pub const fn buffer_len(pixels: usize) -> usize {
        pixels * 2
    }
}

impl From<u16> for Rgb565 {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgb888() {
        assert_eq!(Rgb565::from_rgb888(255, 0, 0), Rgb565::RED);
        assert_eq!(Rgb565::from_rgb888(0, 255, 0), Rgb565::GREEN);
        assert_eq!(Rgb565::from_rgb888(0, 0, 255), Rgb565::BLUE);
        assert_eq!(Rgb565::from_rgb888(255, 255, 255), Rgb565::WHITE);
    }

    #[test]
    fn test_wire_order() {
        assert_eq!(Rgb565(0xF81F).to_be_bytes(), [0xF8, 0x1F]);
        assert_eq!(Rgb565::buffer_len(240), 480);
    }
}
