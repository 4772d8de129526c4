//! # Raspberry Pi Zero 2W Bare-Metal Kernel Entry Point
//!
//! Boot flow: UART and logger, framebuffer negotiation, then the serial
//! echo loop on the text console. When negotiation fails the ACT LED
//! heartbeat takes over.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod kernel {
    use core::arch::global_asm;
    use core::fmt::Write;
    use core::panic::PanicInfo;

    use fbcon::config::KernelConfig;
    use fbcon::display::{color, Negotiator, Surface, TextConsole};
    use fbcon::hal::{Gpio, Mailbox, Uart};
    use fbcon::platform_core::{cpu, Mmio, SystemTimer};
    use fbcon::subsystems::{heartbeat, EchoSession};
    use fbcon::{logging, println};

    // =========================================================================
    // Assembly Boot Code
    // =========================================================================

    global_asm!(include_str!("boot.S"));

    unsafe extern "C" {
        static __kernel_start: u8;
        static __kernel_end: u8;
    }

    const BANNER_RULE: &str =
        "-------------------------------------------------------------------------------\n";

    // =========================================================================
    // Main Entry Point
    // =========================================================================

    #[unsafe(no_mangle)]
    pub extern "C" fn kernel_main() -> ! {
        let config = KernelConfig::DEFAULT;
        let gpio = Gpio::new(Mmio);
        let timer = SystemTimer::new(Mmio);

        let uart = Uart::new(Mmio, config.uart);
        uart.init(&gpio);
        if logging::init(uart.clone(), config.log_level).is_err() {
            uart.write_str("logger already installed\n");
        }
        log::info!("fbcon: running at EL{}", cpu::exception_level());

        let display = config.display;
        let mut negotiator = Negotiator::new(Mailbox::new(Mmio, config.mailbox));
        let info = match negotiator.negotiate(display.width, display.height, display.depth) {
            Ok(info) => info,
            Err(err) => {
                log::error!("framebuffer unavailable (status {}): {}", err.status(), err);
                heartbeat::run(&gpio, &timer, &config.heartbeat)
            }
        };
        println!("Framebuffer: {}", info);

        // SAFETY: the firmware just handed out this allocation and nothing
        // else in the kernel touches it.
        let mut surface = unsafe { Surface::from_info(info) };
        surface.draw_test_pattern(0);

        let mut console = TextConsole::new(&mut surface, color::BLUE, color::BLACK);
        let _ = console.write_str(BANNER_RULE);
        let _ = console.write_str("--==   Raspberry Pi bare-metal framebuffer console   ==--\n");
        let _ = console.write_str(BANNER_RULE);
        let _ = console.write_str("\n");

        // SAFETY: only the addresses of the linker symbols are taken.
        let (start, end) = unsafe {
            (
                (&raw const __kernel_start) as usize,
                (&raw const __kernel_end) as usize,
            )
        };
        console.set_foreground(color::GREEN);
        let _ = writeln!(console, "Kernel image: {:#x}..{:#x} ({} bytes)", start, end, end - start);
        let _ = writeln!(console, "Framebuffer details:\n{}\n", info);

        console.set_foreground(color::WHITE);
        for byte in b' '..=b'~' {
            console.write_byte(byte);
        }
        let _ = console.write_str("\n\n");

        let mut session = EchoSession::new();
        loop {
            console.draw_cursor(color::WHITE);
            let byte = uart.get_byte();
            uart.put_byte(byte);
            if byte == b'\r' {
                uart.put_byte(b'\n');
            }
            console.write_byte(byte);
            if let Some(summary) = session.feed(byte) {
                let _ = writeln!(console, "{}", summary);
            }
        }
    }

    // =========================================================================
    // Panic Handler
    // =========================================================================

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        // Fresh handle: the logger's lock may be held by the panicking code
        let mut uart = Uart::new(Mmio, KernelConfig::DEFAULT.uart);
        let _ = write!(uart, "\n!!! PANIC !!!\n");
        if let Some(loc) = info.location() {
            let _ = writeln!(uart, "{}:{}", loc.file(), loc.line());
        }
        let _ = writeln!(uart, "{}", info.message());
        cpu::wait_forever()
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("kernel8 only runs on bare metal; build with --target aarch64-unknown-none");
}
