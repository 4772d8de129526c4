//! Framebuffer negotiation with the VideoCore firmware
//!
//! This module handles:
//! - The two-step property exchange (configure the mode, then allocate)
//! - Validation of the firmware's response codes
//! - The resulting framebuffer descriptor
//!
//! ```text
//! Idle -> ConfigSent -> ConfigValidated -> AllocSent -> Ready
//!            |                                 |
//!            +------------> Failed <-----------+
//! ```

use core::fmt;

use crate::hal::mailbox::{Channel, Mailbox, MailboxError};
use crate::hal::property::{PropertyBuffer, ResponseCode, TagId, TagValue, FB_ALLOCATE_ALIGNMENT};
use crate::platform_core::mmio::{bus_to_phys, RegisterAccess};

// ============================================================================
// Display Constants
// ============================================================================

/// Font character width (8x8 font)
pub const CHAR_WIDTH: u32 = 8;

/// Font character height (8x8 font)
pub const CHAR_HEIGHT: u32 = 8;

/// Status reported for a successful negotiation
pub const STATUS_OK: u32 = 0;

// ============================================================================
// Framebuffer Descriptor
// ============================================================================

/// Display mode and pixel memory handed out by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferInfo {
    pub width: u32,
    pub height: u32,
    /// Bits per pixel
    pub depth: u32,
    /// Bytes per row
    pub pitch: u32,
    /// Bus address of the pixel memory
    pub address: u32,
    /// Pixel memory size in bytes
    pub size: u32,
    /// Text columns
    pub chars_width: u32,
    /// Text rows
    pub chars_height: u32,
}

impl FramebufferInfo {
    /// Descriptor for the given mode; rows are packed without padding
    pub const fn new(width: u32, height: u32, depth: u32, address: u32, size: u32) -> Self {
        Self {
            width,
            height,
            depth,
            pitch: width.wrapping_mul(depth / 8),
            address,
            size,
            chars_width: width / CHAR_WIDTH,
            chars_height: height / CHAR_HEIGHT,
        }
    }

    pub const fn bytes_per_pixel(&self) -> u32 {
        self.depth / 8
    }

    /// ARM physical address of the pixel memory
    pub const fn phys_address(&self) -> usize {
        bus_to_phys(self.address)
    }
}

impl fmt::Display for FramebufferInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {}bpp, pitch {}, {} bytes at {:#010x} ({}x{} chars)",
            self.width,
            self.height,
            self.depth,
            self.pitch,
            self.size,
            self.address,
            self.chars_width,
            self.chars_height
        )
    }
}

// ============================================================================
// Negotiation State and Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    ConfigSent,
    ConfigValidated,
    AllocSent,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationError {
    /// Firmware handed the buffer back with the request code still in place
    NotProcessed,
    /// Firmware reported an error for the message
    Rejected,
    /// Mailbox transport failed
    Transport(MailboxError),
    /// A tag needed from the response could not be found
    Malformed(TagId),
}

impl NegotiationError {
    /// Numeric status for diagnostics; success is [`STATUS_OK`]
    pub const fn status(&self) -> u32 {
        match self {
            NegotiationError::NotProcessed => 1,
            NegotiationError::Rejected => 2,
            NegotiationError::Transport(_) => 3,
            NegotiationError::Malformed(_) => 4,
        }
    }
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::NotProcessed => f.write_str("firmware did not process the request"),
            NegotiationError::Rejected => f.write_str("firmware rejected the request"),
            NegotiationError::Transport(err) => write!(f, "transport error: {}", err),
            NegotiationError::Malformed(tag) => write!(f, "response lacks tag {:?}", tag),
        }
    }
}

impl core::error::Error for NegotiationError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            NegotiationError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MailboxError> for NegotiationError {
    fn from(err: MailboxError) -> Self {
        NegotiationError::Transport(err)
    }
}

/// Status of a whole negotiation result
pub fn status_of(result: &Result<FramebufferInfo, NegotiationError>) -> u32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(err) => err.status(),
    }
}

// ============================================================================
// Negotiator
// ============================================================================

/// Drives the configure/allocate exchange over a mailbox
pub struct Negotiator<R> {
    mailbox: Mailbox<R>,
    buffer: PropertyBuffer,
    state: NegotiationState,
}

impl<R: RegisterAccess> Negotiator<R> {
    pub const fn new(mailbox: Mailbox<R>) -> Self {
        Self {
            mailbox,
            buffer: PropertyBuffer::new(),
            state: NegotiationState::Idle,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn mailbox(&self) -> &Mailbox<R> {
        &self.mailbox
    }

    /// Ask the firmware for a `width` x `height` display at `bpp` and
    /// allocate its pixel memory.
    ///
    /// The descriptor carries the mode the firmware actually set, which may
    /// differ from the request. Nothing is retried; each call starts a new
    /// negotiation from [`NegotiationState::Idle`].
    pub fn negotiate(
        &mut self,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<FramebufferInfo, NegotiationError> {
        self.state = NegotiationState::Idle;
        match self.run(width, height, bpp) {
            Ok(info) => {
                self.enter(NegotiationState::Ready);
                log::info!("framebuffer: {}", info);
                Ok(info)
            }
            Err(err) => {
                log::error!("framebuffer: negotiation failed in {:?}: {}", self.state, err);
                self.enter(NegotiationState::Failed);
                Err(err)
            }
        }
    }

    fn enter(&mut self, state: NegotiationState) {
        log::debug!("framebuffer: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn run(
        &mut self,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<FramebufferInfo, NegotiationError> {
        self.buffer.encode_configure(width, height, bpp)?;
        self.enter(NegotiationState::ConfigSent);
        self.exchange()?;
        self.enter(NegotiationState::ConfigValidated);

        let (width, height) = match self.response_value(TagId::SetPhysicalSize)? {
            TagValue::Dimensions { width, height } => (width, height),
            _ => return Err(NegotiationError::Malformed(TagId::SetPhysicalSize)),
        };
        let depth = match self.response_value(TagId::SetDepth)? {
            TagValue::BitsPerPixel(bpp) => bpp,
            _ => return Err(NegotiationError::Malformed(TagId::SetDepth)),
        };

        self.buffer.encode_allocate(FB_ALLOCATE_ALIGNMENT)?;
        self.enter(NegotiationState::AllocSent);
        self.exchange()?;

        let (address, size) = match self.response_value(TagId::AllocateBuffer)? {
            TagValue::Allocation { address, size } => (address, size),
            _ => return Err(NegotiationError::Malformed(TagId::AllocateBuffer)),
        };

        Ok(FramebufferInfo::new(width, height, depth, address, size))
    }

    /// One round trip of the current buffer plus response code validation
    fn exchange(&mut self) -> Result<(), NegotiationError> {
        self.mailbox.call(&mut self.buffer, Channel::Property)?;

        match self.buffer.response() {
            ResponseCode::Unprocessed => Err(NegotiationError::NotProcessed),
            ResponseCode::Error => Err(NegotiationError::Rejected),
            ResponseCode::Success => Ok(()),
            ResponseCode::Unknown(code) => {
                log::warn!("framebuffer: unexpected response code {:#010x}", code);
                Ok(())
            }
        }
    }

    fn response_value(&self, id: TagId) -> Result<TagValue, NegotiationError> {
        self.buffer
            .find(id)
            .and_then(|tag| tag.value)
            .ok_or(NegotiationError::Malformed(id))
    }
}

/// One-shot negotiation over `mailbox`
pub fn init_framebuffer<R: RegisterAccess>(
    mailbox: Mailbox<R>,
    width: u32,
    height: u32,
    bpp: u32,
) -> Result<FramebufferInfo, NegotiationError> {
    Negotiator::new(mailbox).negotiate(width, height, bpp)
}
