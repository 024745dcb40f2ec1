//! Flash command protocol: status registers, quad enable and XIP read priming.
//!
//! Everything here talks to the flash chip through raw frames on the SSI data register, as a
//! W25Q-compatible command set expects them. The sequences are written against [`FlashPort`] so
//! boot stage 2 can route the bulky parts through shared out-of-line helpers.

use crate::mmio::Bus;
use crate::ssi::{FrameFormat, InstLen, SpiCtrl, Ssi, SsiConfig, TransType, TransferMode};

pub const CMD_WRITE_STATUS: u8 = 0x01;
pub const CMD_READ: u8 = 0x03;
pub const CMD_WRITE_DISABLE: u8 = 0x04;
pub const CMD_READ_STATUS1: u8 = 0x05;
pub const CMD_WRITE_ENABLE: u8 = 0x06;
pub const CMD_READ_STATUS2: u8 = 0x35;
pub const CMD_QUAD_OUTPUT_READ: u8 = 0x6b;
pub const CMD_QUAD_IO_READ: u8 = 0xeb;

/// Status register 1: write in progress.
pub const SR1_WIP: u8 = 1 << 0;
/// Status register 2: quad enable.
pub const SR2_QE: u8 = 1 << 1;

/// Mode bits sent after the address of a quad I/O read to keep the chip in continuous read mode,
/// so the next read does not resend the opcode.
pub const MODE_CONTINUOUS_READ: u8 = 0xa0;

/// Both flash status registers, read as a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    pub sr1: u8,
    pub sr2: u8,
}

impl Status {
    #[inline(always)]
    pub const fn quad_enabled(self) -> bool {
        self.sr2 & SR2_QE != 0
    }

    #[inline(always)]
    pub const fn write_in_progress(self) -> bool {
        self.sr1 & SR1_WIP != 0
    }

    /// The same status with the quad enable bit set and every other bit untouched.
    #[inline(always)]
    pub const fn with_quad_enabled(self) -> Self {
        Self {
            sr1: self.sr1,
            sr2: self.sr2 | SR2_QE,
        }
    }
}

// ———————————————————————————— Command port ———————————————————————————— //

/// What the flash sequences need from the controller.
///
/// Frames are always passed packed in a word so that no command ever lives in memory: boot stage
/// 2 runs while reads of the XIP window are unusable, and opcodes must be immediates.
pub trait FlashPort {
    /// See [`Ssi::configure`].
    fn configure(&mut self, config: SsiConfig);
    /// See [`Ssi::reshape`].
    fn reshape(&mut self, spi: SpiCtrl);
    fn push(&mut self, frame: u32);
    fn wait_idle(&mut self);
    /// See [`Ssi::transfer`].
    fn transfer(&mut self, frames: u32, count: u32) -> u32;
}

impl<B: Bus> FlashPort for Ssi<B> {
    #[inline(always)]
    fn configure(&mut self, config: SsiConfig) {
        Ssi::configure(self, config);
    }

    #[inline(always)]
    fn reshape(&mut self, spi: SpiCtrl) {
        Ssi::reshape(self, spi);
    }

    #[inline(always)]
    fn push(&mut self, frame: u32) {
        Ssi::push(self, frame);
    }

    #[inline(always)]
    fn wait_idle(&mut self) {
        Ssi::wait_idle(self);
    }

    #[inline(always)]
    fn transfer(&mut self, frames: u32, count: u32) -> u32 {
        Ssi::transfer(self, frames, count)
    }
}

/// Packs command bytes for [`FlashPort::transfer`], first byte lowest.
#[inline(always)]
pub const fn frames(first: u8, second: u8, third: u8) -> u32 {
    first as u32 | (second as u32) << 8 | (third as u32) << 16
}

/// Reads status registers 1 and 2 in a single exchange.
///
/// The controller must be enabled in 8-bit full-duplex mode.
#[inline(always)]
pub fn read_status<P: FlashPort>(port: &mut P) -> Status {
    let rx = port.transfer(frames(CMD_READ_STATUS1, CMD_READ_STATUS2, 0), 2);
    Status {
        sr1: rx as u8,
        sr2: (rx >> 8) as u8,
    }
}

/// Spins until the flash has finished its internal write cycle.
#[inline(always)]
pub fn wait_ready<P: FlashPort>(port: &mut P) {
    while read_status(port).write_in_progress() {
        core::hint::spin_loop();
    }
}

/// Outcome of [`enable_quad`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuadEnable {
    /// The bit was already set, nothing was written.
    AlreadySet,
    /// The status registers were rewritten with the bit set.
    Written,
}

/// Sets the quad enable bit in status register 2 if it is not set yet.
///
/// Read-modify-write: both status bytes are written back as read, with only `QE` added.
#[inline(always)]
pub fn enable_quad<P: FlashPort>(port: &mut P) -> QuadEnable {
    let status = read_status(port);
    if status.quad_enabled() {
        return QuadEnable::AlreadySet;
    }

    let new = status.with_quad_enabled();
    port.transfer(CMD_WRITE_ENABLE as u32, 1);
    port.transfer(frames(CMD_WRITE_STATUS, new.sr1, new.sr2), 3);
    wait_ready(port);
    port.transfer(CMD_WRITE_DISABLE as u32, 1);
    QuadEnable::Written
}

// ———————————————————————————— Read modes ————————————————————————————— //

/// The flash read command XIP runs on, picked at build time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadMode {
    /// `03h`, one data line, the opcode is sent for every read.
    Single,
    /// `6Bh`, opcode and address on one line, data on four, eight dummy cycles.
    QuadOutput,
    /// `EBh`, address and data on four lines. The opcode is sent once, then the chip stays in
    /// continuous read mode and every transfer is address and mode bits only.
    QuadIo,
}

impl ReadMode {
    pub const fn opcode(self) -> u8 {
        match self {
            ReadMode::Single => CMD_READ,
            ReadMode::QuadOutput => CMD_QUAD_OUTPUT_READ,
            ReadMode::QuadIo => CMD_QUAD_IO_READ,
        }
    }

    /// Whether the chip needs `QE` set before this command works.
    #[inline(always)]
    pub const fn needs_quad_enable(self) -> bool {
        !matches!(self, ReadMode::Single)
    }

    /// Controller configuration for the first XIP transfer.
    #[inline(always)]
    pub const fn config(self, clk_div: u32) -> SsiConfig {
        let frame = match self {
            ReadMode::Single => FrameFormat::Std,
            ReadMode::QuadOutput | ReadMode::QuadIo => FrameFormat::Quad,
        };
        let spi = match self {
            ReadMode::Single => SpiCtrl {
                trans_type: TransType::Std,
                addr_bits: 24,
                inst_len: InstLen::Bits8,
                wait_cycles: 0,
                xip_cmd: CMD_READ,
            },
            ReadMode::QuadOutput => SpiCtrl {
                trans_type: TransType::Std,
                addr_bits: 24,
                inst_len: InstLen::Bits8,
                wait_cycles: 8,
                xip_cmd: CMD_QUAD_OUTPUT_READ,
            },
            ReadMode::QuadIo => SpiCtrl {
                trans_type: TransType::CmdStdAddrFrf,
                addr_bits: 32,
                inst_len: InstLen::Bits8,
                wait_cycles: 4,
                xip_cmd: CMD_QUAD_IO_READ,
            },
        };
        SsiConfig {
            clk_div,
            frame,
            frame_bits: 32,
            tmod: TransferMode::EepromRead,
            spi,
        }
    }
}

/// Transfer shape once the chip sits in continuous read mode: no instruction, the mode bits
/// ride at the end of the 32-bit address phase.
pub const CONTINUOUS_READ: SpiCtrl = SpiCtrl {
    trans_type: TransType::Frf,
    addr_bits: 32,
    inst_len: InstLen::None,
    wait_cycles: 4,
    xip_cmd: MODE_CONTINUOUS_READ,
};

/// Configures the controller so that reads of the XIP window become `mode` flash reads.
///
/// For quad I/O this happens in two phases: one read is pushed by hand with the opcode and the
/// continuous read mode bits, then the controller is reshaped to drop the instruction phase.
#[inline(always)]
pub fn prime_xip<P: FlashPort>(port: &mut P, mode: ReadMode, clk_div: u32) {
    port.configure(mode.config(clk_div));

    if let ReadMode::QuadIo = mode {
        port.push(CMD_QUAD_IO_READ as u32);
        // Address 0, mode bits in the low byte of the 32-bit address phase.
        port.push(MODE_CONTINUOUS_READ as u32);
        port.wait_idle();

        port.reshape(CONTINUOUS_READ);
    }
}

/// The whole flash side of boot stage 2: talk to the chip in plain SPI, enable quad mode if
/// needed and leave the controller serving XIP reads.
#[inline(always)]
pub fn init_xip<P: FlashPort>(port: &mut P, mode: ReadMode, clk_div: u32) {
    port.configure(SsiConfig::command(clk_div));
    if mode.needs_quad_enable() {
        enable_quad(port);
    }
    prime_xip(port, mode, clk_div);
}
