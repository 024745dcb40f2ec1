//! Simulated register file for host tests.
//!
//! Plain addresses behave like memory, optionally with a script of successive read values to
//! fake status bits that settle over time. [`Sim::with_flash`] adds a model of the XIP SSI and of
//! a W25Q-style flash chip behind it, which records every exchange and every protocol
//! violation instead of misbehaving silently.
//!
//! Polls are bounded: a register read more than [`SPIN_LIMIT`] times in a row without any
//! other bus access fails the test rather than hanging it.

use std::collections::{HashMap, VecDeque};

use crate::mmio::Bus;
use crate::ssi::{self, SR_BUSY, SR_RFNE, SR_TFE};

const SPIN_LIMIT: u32 = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read(usize, u32),
    Write(usize, u32),
}

/// One read transfer as seen on the flash pins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub opcode: Option<u8>,
    pub address: u32,
    pub mode: Option<u8>,
}

pub struct Sim {
    regs: HashMap<usize, u32>,
    scripts: HashMap<usize, VecDeque<u32>>,
    trace: Vec<Access>,
    violations: Vec<String>,
    ssi: Option<SsiModel>,
    spin: (usize, u32),
}

impl Sim {
    pub fn new() -> Self {
        Self {
            regs: HashMap::new(),
            scripts: HashMap::new(),
            trace: Vec::new(),
            violations: Vec::new(),
            ssi: None,
            spin: (usize::MAX, 0),
        }
    }

    pub fn with_flash() -> Self {
        let mut sim = Self::new();
        sim.ssi = Some(SsiModel::new());
        sim
    }

    pub fn poke(&mut self, addr: usize, value: u32) {
        self.regs.insert(addr, value);
    }

    pub fn peek(&self, addr: usize) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    /// Successive reads of `addr` return `values` in order; the register keeps the last one.
    pub fn script(&mut self, addr: usize, values: &[u32]) {
        self.scripts
            .entry(addr)
            .or_default()
            .extend(values.iter().copied());
    }

    pub fn trace(&self) -> &[Access] {
        &self.trace
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.trace
            .iter()
            .filter_map(|a| match *a {
                Access::Write(addr, value) => Some((addr, value)),
                Access::Read(..) => None,
            })
            .collect()
    }

    pub fn writes_to(&self, addr: usize) -> Vec<u32> {
        self.writes()
            .into_iter()
            .filter(|&(a, _)| a == addr)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn reads_of(&self, addr: usize) -> usize {
        self.trace
            .iter()
            .filter(|access| matches!(access, Access::Read(at, _) if *at == addr))
            .count()
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    // —————————————————————————— Flash model knobs ——————————————————————————— //

    fn model(&mut self) -> &mut SsiModel {
        self.ssi.as_mut().expect("simulation has no flash model")
    }

    /// Number of status polls that report the controller busy at the start of each exchange.
    pub fn set_transfer_latency(&mut self, polls: u32) {
        self.model().latency = polls;
    }

    /// Number of status register reads that report write-in-progress after a status write.
    pub fn set_write_latency(&mut self, reads: u32) {
        self.model().flash.write_latency = reads;
    }

    pub fn set_status(&mut self, sr1: u8, sr2: u8) {
        let flash = &mut self.model().flash;
        flash.sr1 = sr1;
        flash.sr2 = sr2;
    }

    pub fn status(&self) -> (u8, u8) {
        let flash = &self.ssi.as_ref().expect("simulation has no flash model").flash;
        (flash.sr1, flash.sr2)
    }

    /// Command exchanges sent in full-duplex mode, one entry per chip-select cycle.
    pub fn exchanges(&self) -> &[Vec<u8>] {
        &self.ssi.as_ref().expect("simulation has no flash model").exchanges
    }

    /// Read transfers, whether pushed by software or issued by the XIP block.
    pub fn transfers(&self) -> &[Transfer] {
        &self.ssi.as_ref().expect("simulation has no flash model").transfers
    }

    /// A cache line fill by the XIP block at `address`, shaped by the current `SPI_CTRLR0`.
    pub fn xip_fetch(&mut self, address: u32) -> Transfer {
        let spi = self.peek(ssi::SPI_CTRLR0.addr());
        let model = self.ssi.as_mut().expect("simulation has no flash model");
        if !model.enabled {
            self.violations.push(format!("XIP fetch at {address:#x} with the SSI disabled"));
        }
        let inst_l = (spi >> 8) & 0x3;
        let addr_l = (spi >> 2) & 0xf;
        let xip_cmd = (spi >> 24) as u8;
        let transfer = Transfer {
            opcode: (inst_l != 0).then_some(xip_cmd),
            address,
            mode: (addr_l == 8).then_some(if inst_l == 0 { xip_cmd } else { 0 }),
        };
        model.flash.read(&transfer, &mut self.violations);
        model.transfers.push(transfer);
        transfer
    }

    // ——————————————————————————————— SSI ———————————————————————————————— //

    fn ssi_read(&mut self, addr: usize) -> Option<u32> {
        let model = self.ssi.as_mut()?;
        if addr == ssi::SR.addr() {
            if !model.tx.is_empty() {
                if model.pending > 1 {
                    model.pending -= 1;
                    return Some(SR_BUSY);
                }
                if model.pending == 1 {
                    model.pending = 0;
                    return Some(SR_TFE | SR_BUSY);
                }
                let ctrlr0 = self.regs.get(&ssi::CTRLR0.addr()).copied().unwrap_or(0);
                let spi = self.regs.get(&ssi::SPI_CTRLR0.addr()).copied().unwrap_or(0);
                model.complete(ctrlr0, spi, &mut self.violations);
            }
            let rfne = if model.rx.is_empty() { 0 } else { SR_RFNE };
            Some(SR_TFE | rfne)
        } else if addr == ssi::DR0.addr() {
            if !model.tx.is_empty() {
                self.violations
                    .push(String::from("popped before the exchange was observed idle"));
            }
            Some(model.rx.pop_front().unwrap_or_else(|| {
                self.violations.push(String::from("popped an empty receive FIFO"));
                0
            }))
        } else {
            None
        }
    }

    fn ssi_write(&mut self, addr: usize, value: u32) -> bool {
        let Some(model) = self.ssi.as_mut() else {
            return false;
        };
        if addr == ssi::SSIENR.addr() {
            model.enabled = value & 1 != 0;
            if !model.enabled {
                model.tx.clear();
                model.rx.clear();
            }
            self.regs.insert(addr, value);
            true
        } else if addr == ssi::DR0.addr() {
            if !model.enabled {
                self.violations.push(format!("pushed {value:#x} with the SSI disabled"));
            }
            if model.tx.is_empty() {
                model.pending = model.latency;
            }
            model.tx.push(value);
            true
        } else {
            let config = [
                ssi::CTRLR0.addr(),
                ssi::CTRLR1.addr(),
                ssi::BAUDR.addr(),
                ssi::SPI_CTRLR0.addr(),
            ];
            if config.contains(&addr) && model.enabled {
                self.violations
                    .push(format!("configuration register {addr:#x} written while enabled"));
            }
            false
        }
    }
}

impl Bus for Sim {
    fn read(&mut self, addr: usize) -> u32 {
        if self.spin.0 == addr {
            self.spin.1 += 1;
            assert!(self.spin.1 < SPIN_LIMIT, "poll on {addr:#x} never completed");
        } else {
            self.spin = (addr, 0);
        }

        let value = match self.ssi_read(addr) {
            Some(value) => value,
            None => match self.scripts.get_mut(&addr).and_then(|s| s.pop_front()) {
                Some(value) => {
                    self.regs.insert(addr, value);
                    value
                }
                None => self.peek(addr),
            },
        };
        self.trace.push(Access::Read(addr, value));
        value
    }

    fn write(&mut self, addr: usize, value: u32) {
        self.spin = (usize::MAX, 0);
        self.trace.push(Access::Write(addr, value));
        if !self.ssi_write(addr, value) {
            self.regs.insert(addr, value);
        }
    }
}

// —————————————————————————————— SSI model —————————————————————————————— //

struct SsiModel {
    enabled: bool,
    tx: Vec<u32>,
    rx: VecDeque<u32>,
    latency: u32,
    pending: u32,
    flash: FlashModel,
    exchanges: Vec<Vec<u8>>,
    transfers: Vec<Transfer>,
}

impl SsiModel {
    fn new() -> Self {
        Self {
            enabled: false,
            tx: Vec::new(),
            rx: VecDeque::new(),
            latency: 2,
            pending: 0,
            flash: FlashModel::default(),
            exchanges: Vec::new(),
            transfers: Vec::new(),
        }
    }

    /// Chip select goes high: hand the pushed frames to the flash and fill the receive FIFO.
    fn complete(&mut self, ctrlr0: u32, spi: u32, violations: &mut Vec<String>) {
        let frames = core::mem::take(&mut self.tx);
        let tmod = (ctrlr0 >> 8) & 0x3;

        if tmod == ssi::TransferMode::EepromRead as u32 {
            let inst_l = (spi >> 8) & 0x3;
            let addr_l = (spi >> 2) & 0xf;
            let (opcode, rest) = if inst_l != 0 {
                (Some(frames[0] as u8), &frames[1..])
            } else {
                (None, &frames[..])
            };
            let word = rest.first().copied().unwrap_or(0);
            let transfer = if addr_l == 8 {
                Transfer {
                    opcode,
                    address: word >> 8,
                    mode: Some(word as u8),
                }
            } else {
                Transfer {
                    opcode,
                    address: word,
                    mode: None,
                }
            };
            self.flash.read(&transfer, violations);
            self.transfers.push(transfer);
            // CTRLR1.NDF is zero: one data frame comes back.
            self.rx.push_back(0);
        } else {
            let bytes: Vec<u8> = frames.iter().map(|&f| f as u8).collect();
            let response = self.flash.command(&bytes, violations);
            self.rx.extend(response.into_iter().map(u32::from));
            self.exchanges.push(bytes);
        }
    }
}

#[derive(Default)]
struct FlashModel {
    sr1: u8,
    sr2: u8,
    wel: bool,
    write_latency: u32,
    busy_reads: u32,
    continuous: bool,
}

impl FlashModel {
    /// Runs one chip-select cycle of commands, returning one byte per byte received.
    fn command(&mut self, bytes: &[u8], violations: &mut Vec<String>) -> Vec<u8> {
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                0x05 => {
                    let wip = if self.busy_reads > 0 {
                        self.busy_reads -= 1;
                        1
                    } else {
                        0
                    };
                    out.push(self.sr1 | wip);
                }
                0x35 => out.push(self.sr2),
                0x06 => {
                    self.wel = true;
                    out.push(0);
                }
                0x04 => {
                    self.wel = false;
                    out.push(0);
                }
                0x01 => {
                    out.push(0);
                    let data = &bytes[i + 1..];
                    if data.len() < 2 {
                        violations.push(String::from("write status without both status bytes"));
                    } else if !self.wel {
                        violations.push(String::from("write status without write enable"));
                    } else {
                        self.sr1 = data[0] & !0x03;
                        self.sr2 = data[1];
                        self.wel = false;
                        self.busy_reads = self.write_latency;
                    }
                    for _ in data.iter().take(2) {
                        out.push(0);
                    }
                    i += data.len().min(2);
                }
                op => {
                    violations.push(format!("unknown flash opcode {op:#04x}"));
                    out.push(0);
                }
            }
            i += 1;
        }
        out
    }

    fn read(&mut self, transfer: &Transfer, violations: &mut Vec<String>) {
        let continues = transfer.mode.is_some_and(|m| m & 0x30 == 0x20);
        match transfer.opcode {
            Some(op @ (0xeb | 0x6b)) => {
                if self.sr2 & 0x02 == 0 {
                    violations.push(format!("quad read {op:#04x} with QE clear"));
                }
                self.continuous = op == 0xeb && continues;
            }
            Some(0x03) => self.continuous = false,
            Some(op) => violations.push(format!("unknown read opcode {op:#04x}")),
            None => {
                if !self.continuous {
                    violations.push(String::from("address-only read outside continuous mode"));
                }
                self.continuous = continues;
            }
        }
    }
}
