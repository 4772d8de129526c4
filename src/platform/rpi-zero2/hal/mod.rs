//! Hardware Abstraction Layer
//!
//! GPIO, the PL011 console UART and VideoCore mailbox communication.
//! Depends on: platform_core

pub mod gpio;
pub mod mailbox;
pub mod property;
pub mod uart;

#[cfg(test)]
pub(crate) mod fake;

// Re-exports for convenience
pub use gpio::{Gpio, GpioFunction, GpioPull};
pub use mailbox::{Channel, Mailbox, MailboxConfig, MailboxError, MailboxWord};
pub use property::{PropertyBuffer, Tag, TagId, TagValue};
pub use uart::{Uart, UartConfig};
