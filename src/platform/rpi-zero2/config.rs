//! Compile-time kernel configuration
//!
//! Everything the boot path needs is fixed at build time. Cargo features
//! pick between board variants:
//! - `depth32`: negotiate 32 bpp instead of 24
//! - `led_gpio47`: ACT LED on GPIO 47 (Pi 2 / Pi 3 B) instead of GPIO 29
//! - `debug_uart`: log everything down to `trace` level

use log::LevelFilter;

pub use crate::hal::mailbox::MailboxConfig;
pub use crate::hal::uart::UartConfig;

/// Requested display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl DisplayConfig {
    pub const DEFAULT: Self = Self {
        width: 800,
        height: 600,
        depth: if cfg!(feature = "depth32") { 32 } else { 24 },
    };
}

/// Failure blink on the ACT LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub led_pin: u32,
    /// Shortest half-period in microseconds
    pub min_wait_us: u32,
    /// Longest half-period in microseconds
    pub max_wait_us: u32,
    /// Change of the half-period after every toggle
    pub step_us: u32,
}

impl HeartbeatConfig {
    pub const DEFAULT: Self = Self {
        led_pin: if cfg!(feature = "led_gpio47") { 47 } else { 29 },
        min_wait_us: 50_000,
        max_wait_us: 500_000,
        step_us: 25_000,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    pub display: DisplayConfig,
    pub uart: UartConfig,
    pub mailbox: MailboxConfig,
    pub heartbeat: HeartbeatConfig,
    pub log_level: LevelFilter,
}

impl KernelConfig {
    pub const DEFAULT: Self = Self {
        display: DisplayConfig::DEFAULT,
        uart: UartConfig::DEFAULT,
        mailbox: MailboxConfig::DEFAULT,
        heartbeat: HeartbeatConfig::DEFAULT,
        log_level: if cfg!(feature = "debug_uart") {
            LevelFilter::Trace
        } else {
            LevelFilter::Info
        },
    };
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_sweep_is_well_formed() {
        let hb = HeartbeatConfig::DEFAULT;
        assert!(hb.min_wait_us < hb.max_wait_us);
        assert!(hb.step_us > 0 && hb.step_us <= hb.max_wait_us - hb.min_wait_us);
    }

    #[test]
    fn default_display_is_800x600() {
        let display = KernelConfig::DEFAULT.display;
        assert_eq!((display.width, display.height), (800, 600));
        assert!(display.depth == 24 || display.depth == 32);
    }
}
