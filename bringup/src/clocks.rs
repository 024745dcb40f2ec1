//! Clock tree bring-up: 12 MHz crystal, 100 MHz `clk_sys` from the system PLL, ring oscillator
//! off, 1 µs timer tick.

use crate::mmio::{Bus, Reg};
use crate::resets;

pub const XOSC_BASE: usize = 0x4002_4000;
pub const PLL_SYS_BASE: usize = 0x4002_8000;
pub const CLOCKS_BASE: usize = 0x4000_8000;
pub const ROSC_BASE: usize = 0x4006_0000;
pub const WATCHDOG_BASE: usize = 0x4005_8000;

pub const XOSC_CTRL: Reg = Reg::offset(XOSC_BASE, 0x00);
pub const XOSC_STATUS: Reg = Reg::offset(XOSC_BASE, 0x04);

pub const PLL_CS: Reg = Reg::offset(PLL_SYS_BASE, 0x0);
pub const PLL_PWR: Reg = Reg::offset(PLL_SYS_BASE, 0x4);
pub const PLL_FBDIV_INT: Reg = Reg::offset(PLL_SYS_BASE, 0x8);
pub const PLL_PRIM: Reg = Reg::offset(PLL_SYS_BASE, 0xc);

pub const CLK_REF_CTRL: Reg = Reg::offset(CLOCKS_BASE, 0x30);
pub const CLK_REF_SELECTED: Reg = Reg::offset(CLOCKS_BASE, 0x38);
pub const CLK_SYS_CTRL: Reg = Reg::offset(CLOCKS_BASE, 0x3c);
pub const CLK_SYS_SELECTED: Reg = Reg::offset(CLOCKS_BASE, 0x44);
pub const CLK_PERI_CTRL: Reg = Reg::offset(CLOCKS_BASE, 0x48);

pub const ROSC_CTRL: Reg = Reg::offset(ROSC_BASE, 0x00);
pub const WATCHDOG_TICK: Reg = Reg::offset(WATCHDOG_BASE, 0x2c);

pub const XOSC_HZ: u32 = 12_000_000;
pub const SYS_HZ: u32 = 100_000_000;

/// `XOSC_CTRL.ENABLE` magic value.
const XOSC_ENABLE: u32 = 0xfab << 12;
/// `ROSC_CTRL.ENABLE` magic value that stops the oscillator.
const ROSC_DISABLE: u32 = 0xd1e << 12;
const ROSC_ENABLE_MASK: u32 = 0xfff << 12;

/// 12 MHz * 100 = 1200 MHz VCO.
const PLL_FBDIV: u32 = 100;
/// 1200 MHz / 6 / 2 = 100 MHz.
const PLL_POSTDIV: u32 = (6 << 16) | (2 << 12);

const PWR_PD: u32 = 1 << 0;
const PWR_POSTDIVPD: u32 = 1 << 3;
const PWR_VCOPD: u32 = 1 << 5;

/// `clk_ref` source: crystal oscillator.
const REF_SRC_XOSC: u32 = 2;
/// `clk_sys` source: auxiliary mux, which defaults to the system PLL.
const SYS_SRC_AUX: u32 = 1;
/// `clk_peri` enable.
const PERI_ENABLE: u32 = 1 << 11;

/// Watchdog tick divider: one tick per microsecond from the 12 MHz reference.
const TICK_CYCLES: u32 = XOSC_HZ / 1_000_000;

fn xosc_stable(status: u32) -> bool {
    status & (1 << 31) != 0
}

fn pll_locked(cs: u32) -> bool {
    cs & (1 << 31) != 0
}

fn ref_on_xosc(selected: u32) -> bool {
    selected & (1 << REF_SRC_XOSC) != 0
}

fn sys_on_aux(selected: u32) -> bool {
    selected & (1 << SYS_SRC_AUX) != 0
}

/// Brings the clock tree to its running configuration.
///
/// Runs once from the reset handler. Every step waits for the hardware to acknowledge it before
/// moving on.
pub fn init_system<B: Bus>(bus: &mut B) {
    XOSC_CTRL.set_bits(bus, XOSC_ENABLE);
    XOSC_STATUS.wait_until(bus, xosc_stable);

    resets::unreset_wait(bus, resets::PLL_SYS);
    PLL_FBDIV_INT.write(bus, PLL_FBDIV);
    PLL_PWR.clear_bits(bus, PWR_PD | PWR_VCOPD);
    PLL_CS.wait_until(bus, pll_locked);
    PLL_PRIM.write(bus, PLL_POSTDIV);
    PLL_PWR.clear_bits(bus, PWR_POSTDIVPD);

    CLK_REF_CTRL.set_bits(bus, REF_SRC_XOSC);
    CLK_REF_SELECTED.wait_until(bus, ref_on_xosc);
    CLK_SYS_CTRL.set_bits(bus, SYS_SRC_AUX);
    CLK_SYS_SELECTED.wait_until(bus, sys_on_aux);

    ROSC_CTRL.modify(bus, |v| (v & !ROSC_ENABLE_MASK) | ROSC_DISABLE);

    WATCHDOG_TICK.set_bits(bus, TICK_CYCLES);
    resets::unreset_wait(bus, resets::TIMER);
}

/// Feeds `clk_peri` from `clk_sys`, needed by the UART.
pub fn enable_peripheral_clock<B: Bus>(bus: &mut B) {
    CLK_PERI_CTRL.set_bits(bus, PERI_ENABLE);
}
