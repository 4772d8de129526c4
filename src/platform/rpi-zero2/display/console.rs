//! Text console on top of a [`Surface`]
//!
//! This module provides:
//! - A character-cell cursor with wrapping and scrolling
//! - Control character handling (newline, carriage return, backspace)
//! - fmt::Write implementation for use with write!() macro

use core::fmt;

use crate::display::font;
use crate::display::framebuffer::{CHAR_HEIGHT, CHAR_WIDTH};
use crate::display::surface::{Rgb, Surface};

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;

/// A scrolling text console over the whole display
pub struct TextConsole<'a> {
    surface: &'a mut Surface,
    /// Cursor column
    x: u32,
    /// Cursor row
    y: u32,
    fg: Rgb,
    bg: Rgb,
}

impl<'a> TextConsole<'a> {
    /// Console with its cursor in the top-left cell
    pub fn new(surface: &'a mut Surface, fg: Rgb, bg: Rgb) -> Self {
        Self {
            surface,
            x: 0,
            y: 0,
            fg,
            bg,
        }
    }

    pub fn columns(&self) -> u32 {
        self.surface.info().chars_width
    }

    pub fn rows(&self) -> u32 {
        self.surface.info().chars_height
    }

    /// Cursor position as (column, row)
    pub fn cursor(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn set_foreground(&mut self, fg: Rgb) {
        self.fg = fg;
    }

    /// Get the underlying surface (releases mutable borrow)
    pub fn into_surface(self) -> &'a mut Surface {
        self.surface
    }

    /// Paint the cell under the cursor
    pub fn draw_cursor(&mut self, color: Rgb) {
        self.surface.fill_rect(
            self.x * CHAR_WIDTH,
            self.y * CHAR_HEIGHT,
            CHAR_WIDTH,
            CHAR_HEIGHT,
            color,
        );
    }

    /// A display smaller than one cell has nowhere to put text
    fn has_cells(&self) -> bool {
        self.columns() > 0 && self.rows() > 0
    }

    pub fn write_byte(&mut self, byte: u8) {
        if !self.has_cells() {
            return;
        }
        match byte {
            b'\n' | b'\r' => {
                self.draw_cursor(self.bg);
                self.newline();
            }
            BACKSPACE | DELETE => {
                self.draw_cursor(self.bg);
                self.step_back();
            }
            _ => {
                let Some(glyph) = font::glyph(byte) else {
                    return;
                };
                self.surface.draw_glyph(
                    self.x * CHAR_WIDTH,
                    self.y * CHAR_HEIGHT,
                    glyph,
                    self.fg,
                    self.bg,
                );
                self.x += 1;
                if self.x >= self.columns() {
                    self.newline();
                }
            }
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    fn newline(&mut self) {
        self.x = 0;
        self.y += 1;
        self.scroll_if_needed();
    }

    fn step_back(&mut self) {
        if self.x > 0 {
            self.x -= 1;
        } else if self.y > 0 {
            self.x = self.columns().saturating_sub(1);
            self.y -= 1;
        }
    }

    fn scroll_if_needed(&mut self) {
        let rows = self.rows();
        if self.y >= rows {
            let diff = self.y - rows + 1;
            self.surface.scroll_up(diff * CHAR_HEIGHT, self.bg);
            self.y -= diff;
        }
    }
}

impl fmt::Write for TextConsole<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::surface::color;
    use crate::display::surface::tests::TestScreen;
    use core::fmt::Write;

    #[test]
    fn printable_bytes_advance_and_wrap() {
        let mut screen = TestScreen::new(24, 16, 24);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);

        console.write_bytes(b"ab");
        assert_eq!(console.cursor(), (2, 0));

        console.write_byte(b'c');
        assert_eq!(console.cursor(), (0, 1));
    }

    #[test]
    fn glyph_pixels_land_in_cell() {
        let mut screen = TestScreen::new(16, 16, 24);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);

        console.write_bytes(b" |");
        assert_eq!(console.cursor(), (0, 1));

        // '|' is a vertical bar in columns 3-4 of its cell
        let surface = console.into_surface();
        assert_eq!(surface.get_pixel(8 + 3, 0), Some(color::WHITE));
        assert_eq!(surface.get_pixel(8, 0), Some(color::BLACK));
        assert_eq!(surface.get_pixel(3, 0), Some(color::BLACK));
    }

    #[test]
    fn newline_and_carriage_return_start_a_line() {
        let mut screen = TestScreen::new(32, 32, 24);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);

        console.write_bytes(b"ab\r");
        assert_eq!(console.cursor(), (0, 1));
        console.write_bytes(b"x\n");
        assert_eq!(console.cursor(), (0, 2));
    }

    #[test]
    fn non_ascii_and_control_bytes_are_ignored() {
        let mut screen = TestScreen::new(32, 32, 24);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);

        console.write_bytes(&[0xC3, 0xA9, 0x00, b'\t']);

        assert_eq!(console.cursor(), (0, 0));
    }

    #[test]
    fn backspace_wraps_to_previous_row() {
        let mut screen = TestScreen::new(24, 24, 24);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);

        console.write_bytes(b"abcd");
        assert_eq!(console.cursor(), (1, 1));
        console.write_byte(BACKSPACE);
        console.write_byte(BACKSPACE);
        assert_eq!(console.cursor(), (2, 0));
    }

    #[test]
    fn backspace_stops_at_origin() {
        let mut screen = TestScreen::new(24, 24, 24);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);

        console.write_byte(BACKSPACE);

        assert_eq!(console.cursor(), (0, 0));
    }

    #[test]
    fn writing_past_last_row_scrolls() {
        let mut screen = TestScreen::new(16, 16, 24);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);

        write!(console, "|\n|\n").unwrap();

        assert_eq!(console.cursor(), (0, 1));
        let surface = console.into_surface();
        // Second bar scrolled into the top row, bottom row cleared
        assert_eq!(surface.get_pixel(3, 0), Some(color::WHITE));
        assert_eq!(surface.get_pixel(3, 8), Some(color::BLACK));
    }

    #[test]
    fn display_shorter_than_a_cell_ignores_text() {
        let mut screen = TestScreen::new(16, 4, 24);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);
        assert_eq!(console.rows(), 0);

        console.write_bytes(b"ab\n\r|");
        console.write_byte(BACKSPACE);

        assert_eq!(console.cursor(), (0, 0));
        let surface = console.into_surface();
        assert_eq!(surface.get_pixel(3, 0), Some(color::BLACK));
    }

    #[test]
    fn display_narrower_than_a_cell_ignores_text() {
        let mut screen = TestScreen::new(4, 16, 24);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);
        assert_eq!(console.columns(), 0);

        console.write_bytes(b"|\n|");

        assert_eq!(console.cursor(), (0, 0));
    }

    #[test]
    fn cursor_fills_its_cell() {
        let mut screen = TestScreen::new(16, 16, 32);
        let mut console = TextConsole::new(&mut screen.surface, color::WHITE, color::BLACK);
        console.write_byte(b' ');

        console.draw_cursor(color::WHITE);

        let surface = console.into_surface();
        assert_eq!(surface.get_pixel(8, 0), Some(color::WHITE));
        assert_eq!(surface.get_pixel(15, 7), Some(color::WHITE));
        assert_eq!(surface.get_pixel(7, 0), Some(color::BLACK));
    }
}
