//! ACT LED heartbeat
//!
//! Last-resort diagnostic when the display cannot be brought up: the LED
//! blinks with a half-period that sweeps back and forth between the
//! configured bounds, which is easy to tell apart from the firmware's own
//! blink codes.

use crate::config::HeartbeatConfig;
use crate::hal::gpio::{Gpio, GpioFunction};
use crate::platform_core::mmio::RegisterAccess;
use crate::platform_core::timer::SystemTimer;

/// Blink schedule: LED level and half-period for every step
#[derive(Debug, Clone)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    wait_us: u32,
    growing: bool,
    lit: bool,
}

impl Heartbeat {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            wait_us: config.min_wait_us,
            growing: true,
            lit: false,
        }
    }

    /// Toggle the LED; returns the new level and how long to hold it
    pub fn step(&mut self) -> (bool, u32) {
        self.lit = !self.lit;
        let hold = self.wait_us;

        let next = if self.growing {
            self.wait_us.saturating_add(self.config.step_us)
        } else {
            self.wait_us.saturating_sub(self.config.step_us)
        };
        self.wait_us = if next > self.config.max_wait_us {
            self.growing = false;
            self.config.max_wait_us
        } else if next < self.config.min_wait_us {
            self.growing = true;
            self.config.min_wait_us
        } else {
            next
        };

        (self.lit, hold)
    }
}

/// Blink the ACT LED forever
pub fn run<G: RegisterAccess, T: RegisterAccess>(
    gpio: &Gpio<G>,
    timer: &SystemTimer<T>,
    config: &HeartbeatConfig,
) -> ! {
    log::warn!("heartbeat: blinking GPIO {}", config.led_pin);
    gpio.set_function(config.led_pin, GpioFunction::Output);

    let mut heartbeat = Heartbeat::new(*config);
    loop {
        let (lit, hold_us) = heartbeat.step();
        gpio.set_output(config.led_pin, lit);
        timer.delay_us(hold_us);
    }
}
