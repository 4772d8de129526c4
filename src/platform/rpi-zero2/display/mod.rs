//! Display Modules
//!
//! Framebuffer negotiation, pixel drawing and the text console.
//! Depends on: platform_core, hal

pub mod console;
pub mod font;
pub mod framebuffer;
pub mod surface;

// Re-exports for convenience
pub use console::TextConsole;
pub use framebuffer::{
    FramebufferInfo, NegotiationError, NegotiationState, Negotiator, init_framebuffer, status_of,
};
pub use framebuffer::{CHAR_HEIGHT, CHAR_WIDTH, STATUS_OK};
pub use surface::{color, Rgb, Surface};
