//! Minimal driver for the RP2040 UARTs, which are ARM PL011s.

use core::fmt;

use bringup::clocks::{self, SYS_HZ};
use bringup::gpio::{self, Function};
use bringup::mmio::{Bus, Reg};
use bringup::resets;

const UARTDR: usize = 0x00;
const UARTFR: usize = 0x18;
const UARTIBRD: usize = 0x24;
const UARTFBRD: usize = 0x28;
const UARTLCR_H: usize = 0x2c;
const UARTCR: usize = 0x30;

const UARTFR_TXFF: u32 = 1 << 5;
/// 8 data bits, FIFOs enabled.
const UARTLCR_H_8N1_FIFO: u32 = (0b11 << 5) | (1 << 4);
const UARTCR_UARTEN: u32 = 1 << 0;
const UARTCR_TXE: u32 = 1 << 8;
const UARTCR_RXE: u32 = 1 << 9;

/// Integer and fractional baud rate divisors for `baud` from a `clk` Hz peripheral clock.
pub const fn baud_divisors(clk: u32, baud: u32) -> (u32, u32) {
    let div = 8 * clk / baud;
    (div >> 7, ((div & 0x7f) + 1) / 2)
}

/// A PL011 UART on a register bus.
pub struct Pl011<B: Bus> {
    bus: B,
    base: usize,
}

impl<B: Bus> Pl011<B> {
    pub const fn new(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    fn reg(&self, offset: usize) -> Reg {
        Reg::offset(self.base, offset)
    }

    /// Brings UART0 up at `baud`, 8N1, on its GPIO pins.
    ///
    /// `clk_peri` is fed from `clk_sys`, so the clock tree must already be initialized.
    pub fn init_uart0(&mut self, tx: u32, rx: u32, baud: u32) {
        clocks::enable_peripheral_clock(&mut self.bus);
        resets::unreset_wait(&mut self.bus, resets::UART0);

        let (ibrd, fbrd) = baud_divisors(SYS_HZ, baud);
        self.reg(UARTIBRD).write(&mut self.bus, ibrd);
        self.reg(UARTFBRD).write(&mut self.bus, fbrd);
        // The divisors are latched by the LCR_H write.
        self.reg(UARTLCR_H).write(&mut self.bus, UARTLCR_H_8N1_FIFO);
        self.reg(UARTCR)
            .write(&mut self.bus, UARTCR_UARTEN | UARTCR_TXE | UARTCR_RXE);

        gpio::select(&mut self.bus, tx, Function::Uart);
        gpio::select(&mut self.bus, rx, Function::Uart);
    }

    /// Writes a single byte to the UART, blocking until the TX FIFO has space.
    pub fn putc(&mut self, c: u8) {
        self.reg(UARTFR)
            .wait_until(&mut self.bus, |fr| fr & UARTFR_TXFF == 0);
        self.reg(UARTDR).write(&mut self.bus, c as u32);
    }
}

impl<B: Bus> fmt::Write for Pl011<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.bytes() {
            if c == b'\n' {
                self.putc(b'\r');
            }
            self.putc(c);
        }
        Ok(())
    }
}
