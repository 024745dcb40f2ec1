//! Pin function selection and SIO-driven outputs.

use crate::mmio::{Bus, Reg};
use crate::resets;

pub const IO_BANK0_BASE: usize = 0x4001_4000;
pub const SIO_BASE: usize = 0xd000_0000;

pub const GPIO_OUT_SET: Reg = Reg::offset(SIO_BASE, 0x14);
pub const GPIO_OUT_CLR: Reg = Reg::offset(SIO_BASE, 0x18);
pub const GPIO_OUT_XOR: Reg = Reg::offset(SIO_BASE, 0x1c);
pub const GPIO_OE_SET: Reg = Reg::offset(SIO_BASE, 0x24);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Function {
    Uart = 2,
    Sio = 5,
}

/// `GPIOn_CTRL` of bank 0.
pub const fn ctrl(pin: u32) -> Reg {
    Reg::offset(IO_BANK0_BASE, 8 * pin as usize + 4)
}

/// Routes `pin` to `function`, clearing every override.
pub fn select<B: Bus>(bus: &mut B, pin: u32, function: Function) {
    ctrl(pin).write(bus, function as u32);
}

/// A push-pull output driven through SIO.
pub struct Output {
    mask: u32,
}

impl Output {
    /// Takes IO_BANK0 out of reset and makes `pin` a low output.
    pub fn init<B: Bus>(bus: &mut B, pin: u32) -> Self {
        resets::unreset_wait(bus, resets::IO_BANK0);
        let output = Self { mask: 1 << pin };
        GPIO_OUT_CLR.write(bus, output.mask);
        GPIO_OE_SET.write(bus, output.mask);
        select(bus, pin, Function::Sio);
        output
    }

    pub fn set_high<B: Bus>(&self, bus: &mut B) {
        GPIO_OUT_SET.write(bus, self.mask);
    }

    pub fn set_low<B: Bus>(&self, bus: &mut B) {
        GPIO_OUT_CLR.write(bus, self.mask);
    }

    pub fn toggle<B: Bus>(&self, bus: &mut B) {
        GPIO_OUT_XOR.write(bus, self.mask);
    }
}
