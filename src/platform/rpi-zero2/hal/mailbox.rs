//! VideoCore Mailbox Interface
//!
//! The mailbox is a pair of hardware FIFOs shared with the VideoCore
//! firmware. Every transfer is one 32-bit word:
//!
//! ```text
//!  31                                  4 3      0
//! +-------------------------------------+--------+
//! |  payload (16-byte aligned address)  | channel|
//! +-------------------------------------+--------+
//! ```
//!
//! All waits are bounded by [`MailboxConfig`]; a starved read or a stuck
//! write reports [`MailboxError::Timeout`] instead of spinning forever.

use core::fmt;

use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::hal::property::PropertyBuffer;
use crate::platform_core::mmio::{dmb, dsb, RegisterAccess, PERIPHERAL_BASE};

// ============================================================================
// Mailbox Registers
// ============================================================================

const MBOX_BASE: usize = PERIPHERAL_BASE + 0x0000_B880;

pub const MBOX_READ: usize = MBOX_BASE + 0x00;
pub const MBOX_STATUS: usize = MBOX_BASE + 0x18;
pub const MBOX_WRITE: usize = MBOX_BASE + 0x20;

register_bitfields! {
    u32,

    STATUS [
        /// No room to write
        FULL OFFSET(31) NUMBITS(1) [],
        /// Nothing to read
        EMPTY OFFSET(30) NUMBITS(1) []
    ],

    MESSAGE [
        DATA OFFSET(4) NUMBITS(28) [],
        CHANNEL OFFSET(0) NUMBITS(4) []
    ]
}

/// Low bits of a message word reserved for the channel number
const CHANNEL_MASK: u32 = 0xF;

// ============================================================================
// Channels
// ============================================================================

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Power = 0,
    Framebuffer = 1,
    VirtualUart = 2,
    Vchiq = 3,
    Leds = 4,
    Buttons = 5,
    TouchScreen = 6,
    /// Property tags, ARM to VideoCore
    Property = 8,
    /// Property tags, VideoCore to ARM
    PropertyVcToArm = 9,
}

// ============================================================================
// Words and Status
// ============================================================================

/// One 32-bit mailbox transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxWord(u32);

impl MailboxWord {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Word carrying a 16-byte aligned bus address; the channel is zero
    /// until [`with_channel`](Self::with_channel) sets it.
    pub fn from_address(address: u32) -> Self {
        let mut word = LocalRegisterCopy::<u32, MESSAGE::Register>::new(0);
        word.write(MESSAGE::DATA.val(address >> 4));
        Self(word.get())
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    fn fields(self) -> LocalRegisterCopy<u32, MESSAGE::Register> {
        LocalRegisterCopy::new(self.0)
    }

    pub fn channel(self) -> u8 {
        self.fields().read(MESSAGE::CHANNEL) as u8
    }

    /// Payload with the channel bits cleared
    pub fn address(self) -> u32 {
        self.fields().read(MESSAGE::DATA) << 4
    }

    /// Replace the channel field; the upper 28 bits are left untouched
    pub fn with_channel(self, channel: u8) -> Self {
        let mut word = self.fields();
        word.modify(MESSAGE::CHANNEL.val(channel as u32 & CHANNEL_MASK));
        Self(word.get())
    }
}

/// Snapshot of the status register
#[derive(Clone, Copy)]
pub struct MailboxStatus(u32);

impl MailboxStatus {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn fields(self) -> LocalRegisterCopy<u32, STATUS::Register> {
        LocalRegisterCopy::new(self.0)
    }

    pub fn is_full(&self) -> bool {
        self.fields().is_set(STATUS::FULL)
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_set(STATUS::EMPTY)
    }
}

impl fmt::Debug for MailboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxStatus")
            .field("full", &self.is_full())
            .field("empty", &self.is_empty())
            .finish()
    }
}

// ============================================================================
// Configuration and Errors
// ============================================================================

/// Poll ceilings for the two blocking directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxConfig {
    /// Status polls spent waiting for a matching word before giving up
    pub read_poll_limit: u32,
    /// Status polls spent waiting for room in the write FIFO
    pub write_poll_limit: u32,
}

impl MailboxConfig {
    pub const DEFAULT: Self = Self {
        read_poll_limit: 20_000,
        write_poll_limit: 1_000_000,
    };
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// No matching word arrived, or the write FIFO never drained
    Timeout,
    /// Tag list does not fit the property buffer
    BufferOverflow,
    /// Buffer bus address is not 16-byte aligned
    Misaligned,
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailboxError::Timeout => f.write_str("mailbox timed out"),
            MailboxError::BufferOverflow => f.write_str("property message exceeds buffer"),
            MailboxError::Misaligned => f.write_str("property buffer not 16-byte aligned"),
        }
    }
}

impl core::error::Error for MailboxError {}

// ============================================================================
// Mailbox Operations
// ============================================================================

/// Mailbox 0 (VideoCore to ARM) for reads, mailbox 1 for writes
pub struct Mailbox<R> {
    bus: R,
    config: MailboxConfig,
}

impl<R: RegisterAccess> Mailbox<R> {
    pub const fn new(bus: R, config: MailboxConfig) -> Self {
        Self { bus, config }
    }

    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }

    pub fn status(&self) -> MailboxStatus {
        MailboxStatus::from_raw(self.bus.read_word(MBOX_STATUS))
    }

    /// Tag `word` with `channel` and post it once the FIFO has room
    pub fn write(&self, word: MailboxWord, channel: Channel) -> Result<(), MailboxError> {
        let word = word.with_channel(channel as u8);

        let mut polls = 0;
        while self.status().is_full() {
            polls += 1;
            if polls >= self.config.write_poll_limit {
                log::warn!("mailbox: write FIFO full after {} polls", polls);
                return Err(MailboxError::Timeout);
            }
            core::hint::spin_loop();
        }

        dmb();
        self.bus.write_word(MBOX_WRITE, word.raw());
        log::trace!("mailbox: wrote {:#010x}", word.raw());
        Ok(())
    }

    /// Next word addressed to `channel`; words for other channels are dropped
    pub fn read(&self, channel: Channel) -> Result<MailboxWord, MailboxError> {
        self.read_matching(channel, |_| true)
    }

    /// Send `buffer` on `channel` and wait for the firmware to hand it back.
    ///
    /// The response code is left for the caller to judge; this only
    /// guarantees that the firmware has finished with the buffer.
    pub fn call(&self, buffer: &mut PropertyBuffer, channel: Channel) -> Result<(), MailboxError> {
        let address = self.bus.bus_address(buffer.as_mut_ptr());
        if address & CHANNEL_MASK != 0 {
            return Err(MailboxError::Misaligned);
        }
        let request = MailboxWord::from_address(address);

        // Buffer contents must reach memory before the firmware sees the address
        dsb();
        self.write(request, channel)?;
        self.read_matching(channel, |word| word.address() == request.address())?;
        dmb();
        Ok(())
    }

    fn read_matching(
        &self,
        channel: Channel,
        accept: impl Fn(MailboxWord) -> bool,
    ) -> Result<MailboxWord, MailboxError> {
        let mut polls = 0;
        loop {
            loop {
                if polls >= self.config.read_poll_limit {
                    log::warn!(
                        "mailbox: no response on channel {} after {} polls",
                        channel as u8,
                        polls
                    );
                    return Err(MailboxError::Timeout);
                }
                polls += 1;
                if !self.status().is_empty() {
                    break;
                }
                core::hint::spin_loop();
            }

            let word = MailboxWord::from_raw(self.bus.read_word(MBOX_READ));
            dmb();

            if word.channel() == channel as u8 && accept(word) {
                log::trace!("mailbox: read {:#010x}", word.raw());
                return Ok(word);
            }
            log::trace!("mailbox: dropped stray word {:#010x}", word.raw());
        }
    }
}
