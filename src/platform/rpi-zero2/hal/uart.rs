//! PL011 UART0 driver
//!
//! Polled console on GPIO 14 (TXD0) and GPIO 15 (RXD0), 8N1 with FIFOs.
//! The baud divisors come from [`UartConfig`], so the same driver works for
//! firmware that leaves the UART clock at 48 MHz or at 3 MHz.

use core::fmt;

use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::hal::gpio::{pin_mask, Gpio, GpioFunction, GpioPull};
use crate::platform_core::mmio::{RegisterAccess, PERIPHERAL_BASE};

// ============================================================================
// UART Registers
// ============================================================================

const UART0_BASE: usize = PERIPHERAL_BASE + 0x0020_1000;

pub const UART0_DR: usize = UART0_BASE + 0x00;
pub const UART0_FR: usize = UART0_BASE + 0x18;
pub const UART0_IBRD: usize = UART0_BASE + 0x24;
pub const UART0_FBRD: usize = UART0_BASE + 0x28;
pub const UART0_LCRH: usize = UART0_BASE + 0x2C;
pub const UART0_CR: usize = UART0_BASE + 0x30;
pub const UART0_IMSC: usize = UART0_BASE + 0x38;
pub const UART0_ICR: usize = UART0_BASE + 0x44;

const TXD0_PIN: u32 = 14;
const RXD0_PIN: u32 = 15;

register_bitfields! {
    u32,

    /// Flag Register
    FR [
        /// Transmit FIFO full
        TXFF OFFSET(5) NUMBITS(1) [],
        /// Receive FIFO empty
        RXFE OFFSET(4) NUMBITS(1) [],
        /// Still shifting out a frame
        BUSY OFFSET(3) NUMBITS(1) []
    ],

    /// Line Control Register
    LCR_H [
        #[allow(clippy::enum_variant_names)]
        WLEN OFFSET(5) NUMBITS(2) [
            FiveBit = 0b00,
            SixBit = 0b01,
            SevenBit = 0b10,
            EightBit = 0b11
        ],
        FEN OFFSET(4) NUMBITS(1) [
            FifosDisabled = 0,
            FifosEnabled = 1
        ]
    ],

    /// Control Register
    CR [
        RXE OFFSET(9) NUMBITS(1) [],
        TXE OFFSET(8) NUMBITS(1) [],
        UARTEN OFFSET(0) NUMBITS(1) []
    ],

    /// Interrupt Clear Register
    ICR [
        ALL OFFSET(0) NUMBITS(11) []
    ]
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    /// UART reference clock in Hz
    pub clock_hz: u32,
    pub baud: u32,
}

impl UartConfig {
    /// Firmware default clock on the Zero 2W, 115200 baud
    pub const DEFAULT: Self = Self {
        clock_hz: 48_000_000,
        baud: 115_200,
    };

    /// Integer and 6-bit fractional divisor for [`baud`](Self::baud).
    ///
    /// divisor = clock / (16 * baud); the fraction is rounded to 1/64.
    pub const fn divisors(&self) -> (u32, u32) {
        let scaled = (self.clock_hz as u64 * 4 + self.baud as u64 / 2) / self.baud as u64;
        ((scaled >> 6) as u32, (scaled & 0x3F) as u32)
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// UART Operations
// ============================================================================

#[derive(Debug, Clone)]
pub struct Uart<R> {
    bus: R,
    config: UartConfig,
}

impl<R: RegisterAccess> Uart<R> {
    pub const fn new(bus: R, config: UartConfig) -> Self {
        Self { bus, config }
    }

    fn flags(&self) -> LocalRegisterCopy<u32, FR::Register> {
        LocalRegisterCopy::new(self.bus.read_word(UART0_FR))
    }

    /// Route GPIO 14/15 to the UART and program 8N1 at the configured baud rate
    pub fn init<G: RegisterAccess>(&self, gpio: &Gpio<G>) {
        self.bus.write_word(UART0_CR, 0);

        gpio.set_pull(pin_mask(TXD0_PIN) | pin_mask(RXD0_PIN), GpioPull::Off);
        gpio.set_function(TXD0_PIN, GpioFunction::Alt0);
        gpio.set_function(RXD0_PIN, GpioFunction::Alt0);

        let mut icr = LocalRegisterCopy::<u32, ICR::Register>::new(0);
        icr.write(ICR::ALL::SET);
        self.bus.write_word(UART0_ICR, icr.get());

        let (integer, fraction) = self.config.divisors();
        self.bus.write_word(UART0_IBRD, integer);
        self.bus.write_word(UART0_FBRD, fraction);

        let mut lcr = LocalRegisterCopy::<u32, LCR_H::Register>::new(0);
        lcr.write(LCR_H::WLEN::EightBit + LCR_H::FEN::FifosEnabled);
        self.bus.write_word(UART0_LCRH, lcr.get());

        // Polled driver: every interrupt source stays masked
        self.bus.write_word(UART0_IMSC, 0);

        let mut cr = LocalRegisterCopy::<u32, CR::Register>::new(0);
        cr.write(CR::UARTEN::SET + CR::TXE::SET + CR::RXE::SET);
        self.bus.write_word(UART0_CR, cr.get());
    }

    /// Blocking transmit of one byte
    pub fn put_byte(&self, byte: u8) {
        while self.flags().is_set(FR::TXFF) {
            core::hint::spin_loop();
        }
        self.bus.write_word(UART0_DR, byte as u32);
    }

    /// Blocking receive of one byte
    pub fn get_byte(&self) -> u8 {
        loop {
            if let Some(byte) = self.try_get_byte() {
                return byte;
            }
            core::hint::spin_loop();
        }
    }

    pub fn try_get_byte(&self) -> Option<u8> {
        if self.flags().is_set(FR::RXFE) {
            return None;
        }
        Some((self.bus.read_word(UART0_DR) & 0xFF) as u8)
    }

    /// Send `s`, expanding `\n` to `\r\n`
    pub fn write_str(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.put_byte(b'\r');
            }
            self.put_byte(byte);
        }
    }

    /// Wait until the last frame has left the shift register
    pub fn flush(&self) {
        while self.flags().is_set(FR::BUSY) {
            core::hint::spin_loop();
        }
    }
}

impl<R: RegisterAccess> fmt::Write for Uart<R> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Uart::write_str(self, s);
        Ok(())
    }
}
