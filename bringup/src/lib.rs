//! RP2040 boot-time bring-up: SSI flash controller, XIP handoff and the early runtime.
//!
//! Every peripheral access goes through a [`mmio::Bus`], so the sequences in this crate run
//! unchanged against real memory-mapped registers on the target and against a simulated register
//! file in host tests.

#![cfg_attr(not(test), no_std)]

pub mod clocks;
pub mod flash;
pub mod gpio;
pub mod handoff;
pub mod image;
pub mod mmio;
pub mod resets;
pub mod ssi;
pub mod startup;
pub mod timer;
pub mod vectors;

#[cfg(test)]
mod sim;

// ————————————————————————————— Memory Map ————————————————————————————— //

/// Start of the memory-mapped flash window.
pub const XIP_BASE: u32 = 0x1000_0000;

/// Size of the boot stage at the start of flash, the application image follows it.
pub const BOOT2_SIZE: u32 = 0x100;

/// Address of the application image (and its vector table) in the XIP window.
pub const APP_BASE: u32 = XIP_BASE + BOOT2_SIZE;
