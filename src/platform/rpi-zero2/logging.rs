//! UART console output and the `log` backend
//!
//! The console UART is parked in a spin lock once [`init`] runs. Log records
//! go out as `[LEVEL] target: message`; `print!`/`println!` write raw text.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::hal::uart::Uart;
use crate::platform_core::mmio::Mmio;

static CONSOLE: Mutex<Option<Uart<Mmio>>> = Mutex::new(None);

static LOGGER: UartLogger = UartLogger;

/// Install `uart` as the console and route `log` records to it
pub fn init(uart: Uart<Mmio>, level: LevelFilter) -> Result<(), SetLoggerError> {
    *CONSOLE.lock() = Some(uart);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

pub fn _print(args: fmt::Arguments) {
    if let Some(uart) = CONSOLE.lock().as_mut() {
        let _ = uart.write_fmt(args);
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::logging::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println {
    () => { $crate::print!("\n") };
    ($($arg:tt)*) => {
        $crate::logging::_print(format_args!("{}\n", format_args!($($arg)*)))
    };
}

fn write_record(out: &mut impl Write, record: &Record) -> fmt::Result {
    writeln!(out, "[{:<5}] {}: {}", record.level(), record.target(), record.args())
}

pub struct UartLogger;

impl Log for UartLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(uart) = CONSOLE.lock().as_mut() {
            let _ = write_record(uart, record);
        }
    }

    fn flush(&self) {
        if let Some(uart) = CONSOLE.lock().as_ref() {
            uart.flush();
        }
    }
}
