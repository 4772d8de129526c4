//! Drawing primitives over negotiated pixel memory
//!
//! This module provides:
//! - Pixel encoding for 16 (RGB565), 24 (R,G,B bytes) and 32 bpp (ARGB8888)
//! - Rectangle fills, clearing and vertical scrolling
//! - Glyph blitting for the text console
//! - The boot-time test pattern
//!
//! Every access is bounds-checked against both the mode and the size the
//! firmware reported, so a short allocation can never be overrun.

use core::ptr::{self, read_volatile, write_volatile};

use crate::display::framebuffer::FramebufferInfo;

// ============================================================================
// Colors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    const fn to_rgb565(self) -> u16 {
        ((self.r as u16 >> 3) << 11) | ((self.g as u16 >> 2) << 5) | (self.b as u16 >> 3)
    }

    const fn from_rgb565(raw: u16) -> Self {
        Self {
            r: ((raw >> 11) as u8 & 0x1F) << 3,
            g: ((raw >> 5) as u8 & 0x3F) << 2,
            b: (raw as u8 & 0x1F) << 3,
        }
    }
}

pub mod color {
    use super::Rgb;

    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
    pub const RED: Rgb = Rgb::new(0xFF, 0x40, 0x40);
    pub const GREEN: Rgb = Rgb::new(0x64, 0xFA, 0x80);
    pub const BLUE: Rgb = Rgb::new(0x60, 0x80, 0xFF);
    pub const YELLOW: Rgb = Rgb::new(0xFF, 0xE0, 0x40);
    pub const GRAY: Rgb = Rgb::new(0x80, 0x80, 0x80);
}

// ============================================================================
// Surface
// ============================================================================

pub struct Surface {
    info: FramebufferInfo,
    base: *mut u8,
    /// Addressable bytes: the smaller of the mode's extent and the allocation
    len: usize,
}

impl Surface {
    /// # Safety
    ///
    /// `base` must point to `info.size` writable bytes that nothing else
    /// accesses while the surface is alive.
    pub unsafe fn new(info: FramebufferInfo, base: *mut u8) -> Self {
        let extent = info.pitch as usize * info.height as usize;
        Self {
            info,
            base,
            len: extent.min(info.size as usize),
        }
    }

    /// Surface over the pixel memory the firmware allocated
    ///
    /// # Safety
    ///
    /// `info` must describe a live allocation from a successful negotiation.
    pub unsafe fn from_info(info: FramebufferInfo) -> Self {
        unsafe { Self::new(info, info.phys_address() as *mut u8) }
    }

    pub fn info(&self) -> &FramebufferInfo {
        &self.info
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.info.width || y >= self.info.height {
            return None;
        }
        let bpp = self.info.bytes_per_pixel() as usize;
        let offset = y as usize * self.info.pitch as usize + x as usize * bpp;
        (offset + bpp <= self.len).then_some(offset)
    }

    fn write_bytes_at(&mut self, offset: usize, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            // SAFETY: offset() checked offset + bytes_per_pixel against len.
            unsafe { write_volatile(self.base.add(offset + i), *byte) };
        }
    }

    fn read_byte(&self, offset: usize) -> u8 {
        // SAFETY: callers pass offsets validated by offset().
        unsafe { read_volatile(self.base.add(offset)) }
    }

    /// Draw one pixel; coordinates outside the display are ignored
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        let Some(offset) = self.offset(x, y) else {
            return;
        };
        match self.info.depth {
            16 => self.write_bytes_at(offset, &color.to_rgb565().to_le_bytes()),
            24 => self.write_bytes_at(offset, &[color.r, color.g, color.b]),
            32 => self.write_bytes_at(offset, &[color.b, color.g, color.r, 0xFF]),
            _ => {}
        }
    }

    /// Read back one pixel
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        let offset = self.offset(x, y)?;
        match self.info.depth {
            16 => Some(Rgb::from_rgb565(u16::from_le_bytes([
                self.read_byte(offset),
                self.read_byte(offset + 1),
            ]))),
            24 => Some(Rgb::new(
                self.read_byte(offset),
                self.read_byte(offset + 1),
                self.read_byte(offset + 2),
            )),
            32 => Some(Rgb::new(
                self.read_byte(offset + 2),
                self.read_byte(offset + 1),
                self.read_byte(offset),
            )),
            _ => None,
        }
    }

    /// Fill a rectangle, clipped to the display
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        let x_end = x.saturating_add(w).min(self.info.width);
        let y_end = y.saturating_add(h).min(self.info.height);
        for py in y..y_end {
            for px in x..x_end {
                self.put_pixel(px, py, color);
            }
        }
    }

    pub fn clear(&mut self, color: Rgb) {
        self.fill_rect(0, 0, self.info.width, self.info.height, color);
    }

    /// Move the picture up by `pixels` rows and fill the exposed rows
    pub fn scroll_up(&mut self, pixels: u32, fill: Rgb) {
        if pixels == 0 {
            return;
        }
        if pixels >= self.info.height {
            self.clear(fill);
            return;
        }

        let shift = pixels as usize * self.info.pitch as usize;
        let kept = self.len.saturating_sub(shift);
        // SAFETY: source and destination both lie within len; copy handles overlap.
        unsafe { ptr::copy(self.base.add(shift), self.base, kept) };

        self.fill_rect(0, self.info.height - pixels, self.info.width, pixels, fill);
    }

    /// Blit an 8x8 glyph with its top-left corner at (`x`, `y`)
    pub fn draw_glyph(&mut self, x: u32, y: u32, glyph: &[u8; 8], fg: Rgb, bg: Rgb) {
        for (dy, row) in glyph.iter().enumerate() {
            for dx in 0..8u32 {
                let lit = row & (0x80 >> dx) != 0;
                self.put_pixel(x + dx, y + dy as u32, if lit { fg } else { bg });
            }
        }
    }

    /// Diagonal color bands, shifted by `offset`
    pub fn draw_test_pattern(&mut self, offset: u8) {
        for y in 0..self.info.height {
            for x in 0..self.info.width {
                let (x8, y8) = (x as u8, y as u8);
                let color = Rgb::new(
                    x8.wrapping_add(y8).wrapping_add(offset),
                    x8.wrapping_sub(y8).wrapping_add(offset),
                    x8.wrapping_add(y8).wrapping_sub(offset),
                );
                self.put_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Pixel memory plus a surface over it
    pub(crate) struct TestScreen {
        pub memory: Vec<u8>,
        pub surface: Surface,
    }

    impl TestScreen {
        pub fn new(width: u32, height: u32, depth: u32) -> Self {
            let size = width * height * depth / 8;
            let mut memory = vec![0u8; size as usize];
            let info = FramebufferInfo::new(width, height, depth, 0xC010_0000, size);
            let surface = unsafe { Surface::new(info, memory.as_mut_ptr()) };
            Self { memory, surface }
        }
    }

    #[test]
    fn pixel_encoding_per_depth() {
        let color = Rgb::new(0x12, 0x34, 0x56);

        let mut s24 = TestScreen::new(4, 4, 24);
        s24.surface.put_pixel(1, 1, color);
        let off = 4 * 3 + 3;
        assert_eq!(&s24.memory[off..off + 3], &[0x12, 0x34, 0x56]);

        let mut s32 = TestScreen::new(4, 4, 32);
        s32.surface.put_pixel(0, 1, color);
        assert_eq!(&s32.memory[16..20], &[0x56, 0x34, 0x12, 0xFF]);

        let mut s16 = TestScreen::new(4, 4, 16);
        s16.surface.put_pixel(0, 0, Rgb::new(0xFF, 0x00, 0xFF));
        assert_eq!(&s16.memory[0..2], &0xF81Fu16.to_le_bytes());
    }

    #[test]
    fn out_of_bounds_pixels_are_dropped() {
        let mut screen = TestScreen::new(4, 4, 24);

        screen.surface.put_pixel(4, 0, color::WHITE);
        screen.surface.put_pixel(0, 4, color::WHITE);
        screen.surface.fill_rect(2, 2, u32::MAX, u32::MAX, color::WHITE);

        assert_eq!(screen.memory.iter().filter(|&&b| b == 0xFF).count(), 4 * 3);
    }

    #[test]
    fn short_allocation_is_respected() {
        let mut memory = vec![0u8; 4 * 3];
        let info = FramebufferInfo::new(4, 4, 24, 0xC010_0000, 4 * 3);
        let mut surface = unsafe { Surface::new(info, memory.as_mut_ptr()) };

        surface.clear(color::WHITE);

        assert!(memory.iter().all(|&b| b == 0xFF));
        assert_eq!(surface.get_pixel(0, 1), None);
    }

    #[test]
    fn scroll_moves_rows_and_fills_bottom() {
        let mut screen = TestScreen::new(2, 4, 24);
        for y in 0..4 {
            screen.surface.fill_rect(0, y, 2, 1, Rgb::new(y as u8 + 1, 0, 0));
        }

        screen.surface.scroll_up(1, color::BLACK);

        for y in 0..3 {
            assert_eq!(screen.surface.get_pixel(1, y), Some(Rgb::new(y as u8 + 2, 0, 0)));
        }
        assert_eq!(screen.surface.get_pixel(0, 3), Some(color::BLACK));
    }

    #[test]
    fn scroll_past_height_clears() {
        let mut screen = TestScreen::new(2, 2, 32);
        screen.surface.clear(color::WHITE);

        screen.surface.scroll_up(5, color::BLACK);

        assert_eq!(screen.surface.get_pixel(1, 1), Some(color::BLACK));
    }

    #[test]
    fn glyph_rows_map_msb_left() {
        let mut screen = TestScreen::new(8, 8, 24);
        let glyph = [0x80, 0x01, 0, 0, 0, 0, 0, 0];

        screen.surface.draw_glyph(0, 0, &glyph, color::WHITE, color::BLUE);

        assert_eq!(screen.surface.get_pixel(0, 0), Some(color::WHITE));
        assert_eq!(screen.surface.get_pixel(1, 0), Some(color::BLUE));
        assert_eq!(screen.surface.get_pixel(7, 1), Some(color::WHITE));
    }

    #[test]
    fn test_pattern_follows_diagonals() {
        let mut screen = TestScreen::new(8, 8, 24);

        screen.surface.draw_test_pattern(3);

        assert_eq!(screen.surface.get_pixel(2, 1), Some(Rgb::new(6, 4, 0)));
        assert_eq!(screen.surface.get_pixel(0, 1), Some(Rgb::new(4, 2, 254)));
    }
}
