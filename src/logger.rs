//! Logging backend that writes to UART0.

use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};

use bringup::mmio::Mmio;
use log::Level;

use crate::pl011::Pl011;
use crate::platform::{UART0_BASE, UART0_BAUD, UART0_RX_PIN, UART0_TX_PIN};

static LOGGER: Logger = Logger;
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes UART0 and installs the logger.
///
/// # Panics
///
/// Panics if called more than once.
pub fn init() {
    // No compare-and-swap on the Cortex-M0+; this runs once, with interrupts off.
    assert!(
        !INITIALIZED.load(Ordering::Relaxed),
        "logger already initialized"
    );
    INITIALIZED.store(true, Ordering::Relaxed);

    uart().init_uart0(UART0_TX_PIN, UART0_RX_PIN, UART0_BAUD);

    // SAFETY: single core, no interrupt handler is running or can log yet.
    unsafe {
        if log::set_logger_racy(&LOGGER).is_ok() {
            log::set_max_level_racy(log::LevelFilter::Trace);
        }
    }
}

fn uart() -> Pl011<Mmio> {
    // SAFETY: running on the RP2040, UART0 is at its datasheet address.
    Pl011::new(unsafe { Mmio::new() }, UART0_BASE)
}

// ————————————————————————————————— Logger ————————————————————————————————— //

pub struct Logger;

impl log::Log for Logger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                uart(),
                "[{}] {}",
                level_display(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

fn level_display(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31;1mError\x1b[0m",
        Level::Warn => "\x1b[33;1mWarn\x1b[0m ",
        Level::Info => "\x1b[32;1mInfo\x1b[0m ",
        Level::Debug => "\x1b[34;1mDebug\x1b[0m",
        Level::Trace => "\x1b[35;1mTrace\x1b[0m",
    }
}
