//! The XIP synchronous serial interface (a DW_apb_ssi) that talks to the external flash.
//!
//! The controller must be disabled while any configuration register is written, and only
//! re-enabled once the whole configuration is consistent. Every full reconfiguration goes
//! through [`Ssi::configure_raw`], so that ordering holds everywhere.

use crate::mmio::{Bus, Reg};

/// Base address of the XIP SSI.
pub const SSI_BASE: usize = 0x1800_0000;

pub const CTRLR0: Reg = Reg::offset(SSI_BASE, 0x00);
pub const CTRLR1: Reg = Reg::offset(SSI_BASE, 0x04);
pub const SSIENR: Reg = Reg::offset(SSI_BASE, 0x08);
pub const BAUDR: Reg = Reg::offset(SSI_BASE, 0x14);
pub const SR: Reg = Reg::offset(SSI_BASE, 0x28);
pub const DR0: Reg = Reg::offset(SSI_BASE, 0x60);
pub const SPI_CTRLR0: Reg = Reg::offset(SSI_BASE, 0xf4);

/// `SR.BUSY`: a serial transfer is in progress.
pub const SR_BUSY: u32 = 1 << 0;
/// `SR.TFE`: the transmit FIFO is empty.
pub const SR_TFE: u32 = 1 << 2;
/// `SR.RFNE`: the receive FIFO holds at least one frame.
pub const SR_RFNE: u32 = 1 << 3;

/// Returns `true` once the controller has drained its transmit FIFO and finished the transfer.
///
/// This is the condition every exchange waits for before popping its response: keep waiting
/// while the transmit FIFO is not empty or the controller is busy.
#[inline(always)]
pub const fn is_idle(sr: u32) -> bool {
    sr & SR_TFE != 0 && sr & SR_BUSY == 0
}

// ——————————————————————————— Configuration ———————————————————————————— //

/// Number of data lines used for the address and data phases (`CTRLR0.SPI_FRF`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum FrameFormat {
    Std = 0,
    Dual = 1,
    Quad = 2,
}

/// `CTRLR0.TMOD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum TransferMode {
    /// Full duplex: one frame received for every frame sent.
    TxRx = 0,
    /// Send the command frames, then receive `CTRLR1.NDF + 1` frames.
    EepromRead = 3,
}

/// Instruction length (`SPI_CTRLR0.INST_L`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum InstLen {
    None = 0,
    Bits8 = 2,
}

/// How the instruction and address phases are clocked out (`SPI_CTRLR0.TRANS_TYPE`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum TransType {
    /// Instruction and address on one line.
    Std = 0,
    /// Instruction on one line, address in the frame format.
    CmdStdAddrFrf = 1,
    /// Instruction and address in the frame format.
    Frf = 2,
}

/// Shape of the transfers the XIP block issues on its own (`SPI_CTRLR0`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpiCtrl {
    pub trans_type: TransType,
    /// Address phase length in bits, mode bits included.
    pub addr_bits: u32,
    pub inst_len: InstLen,
    pub wait_cycles: u32,
    /// Opcode when there is an instruction phase, mode bits appended to the address otherwise.
    pub xip_cmd: u8,
}

impl SpiCtrl {
    #[inline(always)]
    pub const fn bits(&self) -> u32 {
        (self.trans_type as u32)
            | ((self.addr_bits / 4) << 2)
            | ((self.inst_len as u32) << 8)
            | (self.wait_cycles << 11)
            | ((self.xip_cmd as u32) << 24)
    }
}

impl Default for SpiCtrl {
    fn default() -> Self {
        Self {
            trans_type: TransType::Std,
            addr_bits: 0,
            inst_len: InstLen::None,
            wait_cycles: 0,
            xip_cmd: 0,
        }
    }
}

/// A complete controller configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SsiConfig {
    /// `f_ssi / f_sclk`, must be even.
    pub clk_div: u32,
    pub frame: FrameFormat,
    /// Bits per data frame.
    pub frame_bits: u32,
    pub tmod: TransferMode,
    pub spi: SpiCtrl,
}

impl SsiConfig {
    /// Plain 8-bit full-duplex SPI, used to talk to the flash chip directly.
    #[inline(always)]
    pub const fn command(clk_div: u32) -> Self {
        Self {
            clk_div,
            frame: FrameFormat::Std,
            frame_bits: 8,
            tmod: TransferMode::TxRx,
            spi: SpiCtrl {
                trans_type: TransType::Std,
                addr_bits: 0,
                inst_len: InstLen::None,
                wait_cycles: 0,
                xip_cmd: 0,
            },
        }
    }

    #[inline(always)]
    pub const fn ctrlr0(&self) -> u32 {
        ((self.frame as u32) << 21) | ((self.frame_bits - 1) << 16) | ((self.tmod as u32) << 8)
    }
}

// ——————————————————————————————— Driver ——————————————————————————————— //

/// The SSI, driven over a register bus.
pub struct Ssi<B: Bus> {
    bus: B,
}

impl<B: Bus> Ssi<B> {
    #[inline(always)]
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    #[inline(always)]
    pub fn into_inner(self) -> B {
        self.bus
    }

    #[inline(always)]
    pub fn disable(&mut self) {
        SSIENR.write(&mut self.bus, 0);
    }

    #[inline(always)]
    pub fn enable(&mut self) {
        SSIENR.write(&mut self.bus, 1);
    }

    /// Disables the controller, applies `config` and enables it again.
    ///
    /// No flash command can be issued before the enabling write: it is the last bus access of
    /// this function.
    #[inline(always)]
    pub fn configure(&mut self, config: SsiConfig) {
        self.configure_raw(config.clk_div, config.ctrlr0(), config.spi.bits());
    }

    /// [`Ssi::configure`] with the register values already encoded.
    #[inline(always)]
    pub fn configure_raw(&mut self, baudr: u32, ctrlr0: u32, spi_ctrlr0: u32) {
        self.disable();
        BAUDR.write(&mut self.bus, baudr);
        CTRLR0.write(&mut self.bus, ctrlr0);
        CTRLR1.write(&mut self.bus, 0);
        SPI_CTRLR0.write(&mut self.bus, spi_ctrlr0);
        self.enable();
    }

    /// Only rewrites `SPI_CTRLR0`, keeping the rest of the configuration.
    #[inline(always)]
    pub fn reshape(&mut self, spi: SpiCtrl) {
        self.disable();
        SPI_CTRLR0.write(&mut self.bus, spi.bits());
        self.enable();
    }

    /// Pushes one frame into the transmit FIFO.
    #[inline(always)]
    pub fn push(&mut self, frame: u32) {
        DR0.write(&mut self.bus, frame);
    }

    /// Pops one frame from the receive FIFO.
    #[inline(always)]
    pub fn pop(&mut self) -> u32 {
        DR0.read(&mut self.bus)
    }

    /// Spins until every pushed frame went out and the controller is idle.
    #[inline(always)]
    pub fn wait_idle(&mut self) {
        SR.wait_until(&mut self.bus, is_idle);
    }

    /// Sends `count` 8-bit frames as one exchange and returns the frames clocked back.
    ///
    /// Frames travel packed in a word, the first one in the low byte, in both directions.
    /// `count` is 1 to 4. Exactly `count` frames are popped so the receive FIFO stays matched
    /// with the transmit side.
    #[inline(always)]
    pub fn transfer(&mut self, frames: u32, count: u32) -> u32 {
        let mut tx = frames;
        let mut left = count;
        loop {
            // Bits above the frame size are ignored by the controller.
            self.push(tx);
            tx >>= 8;
            left -= 1;
            if left == 0 {
                break;
            }
        }

        self.wait_idle();

        let mut rx = 0;
        let mut shift = 0;
        let mut left = count;
        loop {
            rx |= (self.pop() & 0xff) << shift;
            shift += 8;
            left -= 1;
            if left == 0 {
                break;
            }
        }
        rx
    }
}
