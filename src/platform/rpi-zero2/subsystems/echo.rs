//! Serial echo bookkeeping
//!
//! Every received byte is echoed by the caller; the session keeps a running
//! total of the byte values on the current line and reports it when the
//! line is terminated with a carriage return.

use core::fmt;

/// Totals for one terminated line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSummary {
    /// Bytes received before the terminator
    pub bytes: u32,
    /// Sum of the byte values, terminator included
    pub total: u32,
}

impl fmt::Display for LineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes, total {} (doubled {})",
            self.bytes,
            self.total,
            self.total.wrapping_add(self.total)
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct EchoSession {
    bytes: u32,
    total: u32,
}

impl EchoSession {
    pub const fn new() -> Self {
        Self { bytes: 0, total: 0 }
    }

    /// Account for `byte`; a carriage return closes the line
    pub fn feed(&mut self, byte: u8) -> Option<LineSummary> {
        self.total = self.total.wrapping_add(byte as u32);
        if byte != b'\r' {
            self.bytes = self.bytes.saturating_add(1);
            return None;
        }

        let summary = LineSummary {
            bytes: self.bytes,
            total: self.total,
        };
        *self = Self::new();
        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriage_return_reports_and_resets() {
        let mut session = EchoSession::new();

        assert_eq!(session.feed(b'A'), None);
        assert_eq!(session.feed(b'B'), None);
        let summary = session.feed(b'\r').unwrap();

        assert_eq!(summary, LineSummary { bytes: 2, total: 65 + 66 + 13 });
        assert_eq!(session.feed(b'\r'), Some(LineSummary { bytes: 0, total: 13 }));
    }

    #[test]
    fn newline_does_not_close_a_line() {
        let mut session = EchoSession::new();
        assert_eq!(session.feed(b'\n'), None);
    }

    #[test]
    fn summary_renders() {
        let summary = LineSummary { bytes: 1, total: 110 };
        assert_eq!(summary.to_string(), "1 bytes, total 110 (doubled 220)");
    }
}
