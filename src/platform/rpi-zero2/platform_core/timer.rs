//! System timer and busy-wait delays
//!
//! The BCM2837 system timer is a free-running 64-bit counter ticking at
//! 1 MHz, readable as two 32-bit halves.

use crate::platform_core::mmio::{RegisterAccess, PERIPHERAL_BASE};

const SYSTIMER_BASE: usize = PERIPHERAL_BASE + 0x0000_3000;

/// Counter low 32 bits
pub const SYSTIMER_CLO: usize = SYSTIMER_BASE + 0x04;

/// Counter high 32 bits
pub const SYSTIMER_CHI: usize = SYSTIMER_BASE + 0x08;

/// Microsecond clock backed by the system timer
#[derive(Debug, Clone, Copy)]
pub struct SystemTimer<R> {
    bus: R,
}

impl<R: RegisterAccess> SystemTimer<R> {
    pub const fn new(bus: R) -> Self {
        Self { bus }
    }

    /// Low 32 bits of the counter; wraps every ~71 minutes
    #[inline]
    pub fn micros(&self) -> u32 {
        self.bus.read_word(SYSTIMER_CLO)
    }

    /// Full 64-bit counter value
    pub fn micros64(&self) -> u64 {
        loop {
            let hi = self.bus.read_word(SYSTIMER_CHI);
            let lo = self.bus.read_word(SYSTIMER_CLO);
            // CLO wrapped between the two reads
            if self.bus.read_word(SYSTIMER_CHI) == hi {
                return ((hi as u64) << 32) | lo as u64;
            }
        }
    }

    /// Spin for at least `us` microseconds
    pub fn delay_us(&self, us: u32) {
        let start = self.micros();
        while self.micros().wrapping_sub(start) < us {
            core::hint::spin_loop();
        }
    }

    /// Spin for at least `ms` milliseconds
    pub fn delay_ms(&self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// Spin for roughly `count` CPU cycles.
///
/// Used for the settle times the GPIO pull-up/down sequence asks for, which
/// are specified in cycles rather than wall time.
#[inline(never)]
pub fn spin_cycles(count: u32) {
    for _ in 0..count {
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::FakeBus;

    #[test]
    fn delay_waits_until_elapsed() {
        let bus = FakeBus::new();
        bus.script(SYSTIMER_CLO, [1_000, 1_000, 1_040, 1_099, 1_100]);
        let timer = SystemTimer::new(&bus);

        timer.delay_us(100);

        assert_eq!(bus.read_count(SYSTIMER_CLO), 5);
    }

    #[test]
    fn delay_survives_counter_wrap() {
        let bus = FakeBus::new();
        bus.script(SYSTIMER_CLO, [u32::MAX - 10, u32::MAX, 5, 20]);
        let timer = SystemTimer::new(&bus);

        timer.delay_us(20);

        assert_eq!(bus.read_count(SYSTIMER_CLO), 4);
    }

    #[test]
    fn micros64_rereads_on_high_word_change() {
        let bus = FakeBus::new();
        // First pass sees CHI tick from 1 to 2, second pass is stable
        bus.script(SYSTIMER_CHI, [1, 2, 2, 2]);
        bus.script(SYSTIMER_CLO, [0xFFFF_FFFF, 0x10]);
        let timer = SystemTimer::new(&bus);

        assert_eq!(timer.micros64(), (2u64 << 32) | 0x10);
        assert_eq!(bus.read_count(SYSTIMER_CHI), 4);
        assert_eq!(bus.read_count(SYSTIMER_CLO), 2);
    }
}
