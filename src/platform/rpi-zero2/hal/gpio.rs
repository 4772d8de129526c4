//! GPIO configuration for Raspberry Pi Zero 2W
//!
//! This module handles:
//! - Pin function selection (UART0 on GPIO 14/15 uses ALT0)
//! - Output levels for the ACT LED
//! - Pull-up/down configuration

use crate::platform_core::mmio::{RegisterAccess, PERIPHERAL_BASE};
use crate::platform_core::timer::spin_cycles;

// ============================================================================
// GPIO Register Addresses
// ============================================================================

const GPIO_BASE: usize = PERIPHERAL_BASE + 0x0020_0000;

/// GPIO Function Select registers (3 bits per pin, 10 pins per register)
const GPFSEL0: usize = GPIO_BASE + 0x00;

/// GPIO Pin Output Set registers
const GPSET0: usize = GPIO_BASE + 0x1C; // GPIO 0-31
const GPSET1: usize = GPIO_BASE + 0x20; // GPIO 32-53

/// GPIO Pin Output Clear registers
const GPCLR0: usize = GPIO_BASE + 0x28; // GPIO 0-31
const GPCLR1: usize = GPIO_BASE + 0x2C; // GPIO 32-53

/// GPIO Pin Level registers
const GPLEV0: usize = GPIO_BASE + 0x34; // GPIO 0-31
const GPLEV1: usize = GPIO_BASE + 0x38; // GPIO 32-53

/// GPIO Pull-up/down Enable register
const GPPUD: usize = GPIO_BASE + 0x94;

/// GPIO Pull-up/down Enable Clock registers
const GPPUDCLK0: usize = GPIO_BASE + 0x98; // GPIO 0-31
const GPPUDCLK1: usize = GPIO_BASE + 0x9C; // GPIO 32-53

/// Highest pin number on the BCM2837
pub const MAX_PIN: u32 = 53;

/// Settle time of the pull-up/down control signal
const PULL_SETTLE_CYCLES: u32 = 150;

// ============================================================================
// GPIO Function Select Values
// ============================================================================

/// GPIO function select values (3 bits each)
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioFunction {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

/// GPIO pull-up/down configuration
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioPull {
    Off = 0,
    Down = 1,
    Up = 2,
}

/// Bit for `pin` in a 54-bit pin mask
pub const fn pin_mask(pin: u32) -> u64 {
    1 << pin
}

// ============================================================================
// GPIO Operations
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Gpio<R> {
    bus: R,
}

impl<R: RegisterAccess> Gpio<R> {
    pub const fn new(bus: R) -> Self {
        Self { bus }
    }

    /// Set the function of a single pin, leaving its nine neighbours alone
    pub fn set_function(&self, pin: u32, function: GpioFunction) {
        if pin > MAX_PIN {
            return;
        }
        let reg_addr = GPFSEL0 + (pin / 10) as usize * 4;
        let shift = (pin % 10) * 3;
        let mask = 0b111 << shift;

        let val = self.bus.read_word(reg_addr);
        self.bus
            .write_word(reg_addr, (val & !mask) | ((function as u32) << shift));
    }

    /// Drive an output pin high or low
    pub fn set_output(&self, pin: u32, high: bool) {
        if pin > MAX_PIN {
            return;
        }
        let (set, clear, bit) = if pin < 32 {
            (GPSET0, GPCLR0, pin)
        } else {
            (GPSET1, GPCLR1, pin - 32)
        };
        self.bus.write_word(if high { set } else { clear }, 1 << bit);
    }

    /// Read the level of a pin
    pub fn read_level(&self, pin: u32) -> bool {
        if pin > MAX_PIN {
            return false;
        }
        let (reg, bit) = if pin < 32 { (GPLEV0, pin) } else { (GPLEV1, pin - 32) };
        self.bus.read_word(reg) & (1 << bit) != 0
    }

    /// Apply `pull` to every pin set in `pins` (see [`pin_mask`])
    pub fn set_pull(&self, pins: u64, pull: GpioPull) {
        let low = pins as u32;
        let high = (pins >> 32) as u32 & 0x003F_FFFF;

        self.bus.write_word(GPPUD, pull as u32);
        spin_cycles(PULL_SETTLE_CYCLES);

        // Clock the control signal into the selected pins
        self.bus.write_word(GPPUDCLK0, low);
        self.bus.write_word(GPPUDCLK1, high);
        spin_cycles(PULL_SETTLE_CYCLES);

        self.bus.write_word(GPPUD, 0);
        self.bus.write_word(GPPUDCLK0, 0);
        self.bus.write_word(GPPUDCLK1, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::FakeBus;

    #[test]
    fn set_function_preserves_neighbours() {
        let bus = FakeBus::new();
        let gpfsel1 = GPFSEL0 + 4;
        bus.set(gpfsel1, 0xFFFF_FFFF);
        let gpio = Gpio::new(&bus);

        gpio.set_function(14, GpioFunction::Alt0);

        // Pin 14 occupies bits 12..15 of GPFSEL1
        assert_eq!(bus.get(gpfsel1), (0xFFFF_FFFF & !(0b111 << 12)) | (0b100 << 12));
    }

    #[test]
    fn set_function_on_high_bank() {
        let bus = FakeBus::new();
        let gpio = Gpio::new(&bus);

        gpio.set_function(47, GpioFunction::Output);

        assert_eq!(bus.get(GPFSEL0 + 16), 0b001 << 21);
    }

    #[test]
    fn out_of_range_pins_are_ignored() {
        let bus = FakeBus::new();
        let gpio = Gpio::new(&bus);

        gpio.set_function(54, GpioFunction::Output);
        gpio.set_output(60, true);

        assert!(bus.writes().is_empty());
        assert!(!gpio.read_level(99));
    }

    #[test]
    fn outputs_use_set_and_clear_registers() {
        let bus = FakeBus::new();
        let gpio = Gpio::new(&bus);

        gpio.set_output(29, true);
        gpio.set_output(47, false);

        assert_eq!(bus.writes(), vec![(GPSET0, 1 << 29), (GPCLR1, 1 << 15)]);
    }

    #[test]
    fn read_level_picks_bank() {
        let bus = FakeBus::new();
        bus.set(GPLEV0, 1 << 3);
        bus.set(GPLEV1, 1 << 2);
        let gpio = Gpio::new(&bus);

        assert!(gpio.read_level(3));
        assert!(!gpio.read_level(4));
        assert!(gpio.read_level(34));
    }

    #[test]
    fn pull_sequence_clocks_masked_pins() {
        let bus = FakeBus::new();
        let gpio = Gpio::new(&bus);

        gpio.set_pull(pin_mask(14) | pin_mask(15) | pin_mask(40), GpioPull::Off);

        assert_eq!(
            bus.writes(),
            vec![
                (GPPUD, 0),
                (GPPUDCLK0, (1 << 14) | (1 << 15)),
                (GPPUDCLK1, 1 << 8),
                (GPPUD, 0),
                (GPPUDCLK0, 0),
                (GPPUDCLK1, 0),
            ]
        );
    }
}
