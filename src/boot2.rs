//! Boot stage 2.
//!
//! The mask ROM copies the first 256 bytes of flash to the top of SRAM, checks the trailing CRC
//! and jumps to the first byte. Everything below must therefore fit in 252 bytes and run from
//! wherever it was copied. Calls may only target code in a `.boot2*` section: `bl` is relative,
//! and the linker script places those sections together, entry point first. Nothing may be read
//! from `.rodata`: XIP reads are unusable while the SSI is being reconfigured, so every constant
//! is an immediate or sits in a literal pool next to the code using it.
//!
//! The two helpers below are the only out-of-line code. Everything else is `#[inline(always)]`.
//! `ci/check-boot2.sh` builds every feature combination and rejects any literal pointing into
//! flash outside the block.
//!
//! Regenerate `boot2_crc.rs` whenever this file, the read mode or the handoff changes, then
//! check the linked image:
//!
//! ```text
//! arm-none-eabi-objcopy -O binary -j .boot2 xipblink boot2.bin
//! trailer --crc-only --output src/boot2_crc.rs boot2.bin
//! arm-none-eabi-objcopy -O binary xipblink xipblink.bin
//! trailer --check xipblink.bin
//! ```

use bringup::flash::{self, FlashPort};
use bringup::mmio::Mmio;
use bringup::ssi::{SpiCtrl, Ssi, SsiConfig};
use bringup::{APP_BASE, handoff};

use crate::arch::CortexM0;
use crate::config::{CLK_DIV, HANDOFF, READ_MODE};

#[unsafe(no_mangle)]
#[unsafe(link_section = ".boot2")]
pub unsafe extern "C" fn boot_stage2() -> ! {
    flash::init_xip(&mut BootSsi, READ_MODE, CLK_DIV);

    // SAFETY: the SSI registers are the only thing boot stage 2 touched so far.
    let mut bus = unsafe { Mmio::new() };
    // SAFETY: the ROM runs boot stage 2 in privileged thread mode, and the application image
    // follows this block in flash.
    unsafe {
        let mut cpu = CortexM0::new();
        handoff::hand_off(&mut bus, &mut cpu, HANDOFF, APP_BASE)
    }
}

/// The SSI as seen from boot stage 2: full reconfigurations and command exchanges go through one
/// shared copy each, the rest is inlined.
struct BootSsi;

impl BootSsi {
    #[inline(always)]
    fn ssi() -> Ssi<Mmio> {
        // SAFETY: we are on the RP2040, the ROM left the SSI pins routed to the flash.
        Ssi::new(unsafe { Mmio::new() })
    }
}

impl FlashPort for BootSsi {
    #[inline(always)]
    fn configure(&mut self, config: SsiConfig) {
        configure(config.clk_div, config.ctrlr0(), config.spi.bits());
    }

    #[inline(always)]
    fn reshape(&mut self, spi: SpiCtrl) {
        Self::ssi().reshape(spi);
    }

    #[inline(always)]
    fn push(&mut self, frame: u32) {
        Self::ssi().push(frame);
    }

    #[inline(always)]
    fn wait_idle(&mut self) {
        Self::ssi().wait_idle();
    }

    #[inline(always)]
    fn transfer(&mut self, frames: u32, count: u32) -> u32 {
        transfer(frames, count)
    }
}

#[inline(never)]
#[unsafe(link_section = ".boot2.text")]
extern "C" fn configure(baudr: u32, ctrlr0: u32, spi_ctrlr0: u32) {
    BootSsi::ssi().configure_raw(baudr, ctrlr0, spi_ctrlr0);
}

#[inline(never)]
#[unsafe(link_section = ".boot2.text")]
extern "C" fn transfer(frames: u32, count: u32) -> u32 {
    BootSsi::ssi().transfer(frames, count)
}
