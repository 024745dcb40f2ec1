//! Builds the firmware in every configuration and checks its boot block.
//!
//! The linker script already refuses a boot stage over 252 bytes. What it cannot see is code that
//! only works from flash: the ROM runs the block from a copy in SRAM, with XIP unusable until boot
//! stage 2 is done. So the `.boot2` disassembly must not branch out of the block nor load an
//! address of the flash window other than the application's.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use bringup::image::{self, BLOCK_SIZE, PAYLOAD_SIZE};
use bringup::{APP_BASE, XIP_BASE};
use clap::Args;
use log::{debug, error, info};
use thiserror::Error;

const TARGET: &str = "thumbv6m-none-eabi";

/// Firmware feature sets: every read mode with both handoffs.
const FEATURES: [&str; 6] = [
    "",
    "read-quad-output",
    "read-single",
    "handoff-call",
    "read-quad-output,handoff-call",
    "read-single,handoff-call",
];

/// Every alias of the flash window (cached, uncached, no-allocate, both).
const XIP_ALIASES: std::ops::Range<u32> = 0x1000_0000..0x1400_0000;

#[derive(Args, Debug)]
pub struct Boot2Args {
    /// objdump able to disassemble Thumb code.
    #[arg(long, default_value = "arm-none-eabi-objdump")]
    objdump: String,

    /// objcopy used to extract the boot block.
    #[arg(long, default_value = "arm-none-eabi-objcopy")]
    objcopy: String,

    /// Skip the dev profile.
    #[arg(long)]
    release_only: bool,
}

#[derive(Debug, Error)]
pub enum XtaskError {
    #[error("`{0}` failed")]
    Command(String),
    #[error("{build}: {count} reference(s) out of the boot block")]
    Escapes { build: Build, count: usize },
    #[error("{}: expected a 256-byte boot block, got {len}", .path.display())]
    BlockSize { path: PathBuf, len: usize },
    #[error("{}: stale boot stage 2 CRC, regenerate src/boot2_crc.rs", .0.display())]
    StaleCrc(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Release,
}

#[derive(Clone, Copy, Debug)]
pub struct Build {
    profile: Profile,
    features: &'static str,
}

impl Build {
    fn dir(self) -> &'static str {
        match self.profile {
            Profile::Dev => "debug",
            Profile::Release => "release",
        }
    }

    /// The checked-in `boot2_crc.rs` is generated for this build.
    fn is_shipped(self) -> bool {
        self.profile == Profile::Release && self.features.is_empty()
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let features = if self.features.is_empty() {
            "default"
        } else {
            self.features
        };
        write!(f, "{}/{features}", self.dir())
    }
}

pub fn run(args: Boot2Args) -> Result<(), XtaskError> {
    let root = workspace_root();
    let profiles: &[Profile] = if args.release_only {
        &[Profile::Release]
    } else {
        &[Profile::Dev, Profile::Release]
    };

    for &profile in profiles {
        for features in FEATURES {
            let build = Build { profile, features };
            let elf = cargo_build(&root, build)?;

            let disassembly = sh(Command::new(&args.objdump)
                .args(["-d", "--section=.boot2"])
                .arg(&elf))?;
            let escapes = scan(&disassembly);
            for escape in &escapes {
                error!("{build}: {escape}");
            }
            if !escapes.is_empty() {
                return Err(XtaskError::Escapes {
                    build,
                    count: escapes.len(),
                });
            }

            if build.is_shipped() {
                check_crc(&args.objcopy, &elf)?;
            }
            info!("{build}: ok");
        }
    }
    Ok(())
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn cargo_build(root: &Path, build: Build) -> Result<PathBuf, XtaskError> {
    let cargo = std::env::var("CARGO").unwrap_or_else(|_| String::from("cargo"));
    let mut cmd = Command::new(cargo);
    cmd.current_dir(root)
        .args(["build", "-p", "xipblink", "--target", TARGET, "--no-default-features"]);
    if !build.features.is_empty() {
        cmd.args(["--features", build.features]);
    }
    if build.profile == Profile::Release {
        cmd.arg("--release");
    }
    sh(&mut cmd)?;
    Ok(root.join("target").join(TARGET).join(build.dir()).join("xipblink"))
}

fn check_crc(objcopy: &str, elf: &Path) -> Result<(), XtaskError> {
    let path = elf.with_file_name("boot2.bin");
    sh(Command::new(objcopy)
        .args(["-O", "binary", "-j", ".boot2", "-j", ".boot2_crc"])
        .arg(elf)
        .arg(&path))?;

    let bytes = fs::read(&path)?;
    let block: &[u8; BLOCK_SIZE] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| XtaskError::BlockSize {
            path: path.clone(),
            len: bytes.len(),
        })?;
    if !image::verify(block) {
        return Err(XtaskError::StaleCrc(path));
    }
    Ok(())
}

fn sh(cmd: &mut Command) -> Result<String, XtaskError> {
    debug!("{cmd:?}");
    let output = cmd.stderr(Stdio::inherit()).output()?;
    if !output.status.success() {
        return Err(XtaskError::Command(format!("{cmd:?}")));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// —————————————————————————— Disassembly scan —————————————————————————— //

/// Something in `.boot2` that only works while the code runs from flash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Escape {
    /// A branch whose target lies outside the block.
    Branch { at: u32, target: u32 },
    /// A literal pool word pointing into the flash window outside the block.
    Literal { at: u32, value: u32 },
}

impl fmt::Display for Escape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Escape::Branch { at, target } => write!(f, "{at:#010x}: branch to {target:#010x}"),
            Escape::Literal { at, value } => write!(f, "{at:#010x}: literal {value:#010x}"),
        }
    }
}

fn in_block(addr: u32) -> bool {
    (XIP_BASE..XIP_BASE + PAYLOAD_SIZE as u32).contains(&addr)
}

fn is_branch(mnemonic: &str) -> bool {
    const CONDITIONS: [&str; 16] = [
        "eq", "ne", "cs", "cc", "hs", "lo", "mi", "pl", "vs", "vc", "hi", "ls", "ge", "lt", "gt",
        "le",
    ];
    let base = mnemonic.trim_end_matches(".n").trim_end_matches(".w");
    match base.strip_prefix('b') {
        Some("" | "l") => true,
        Some(cond) => CONDITIONS.contains(&cond),
        None => false,
    }
}

fn hex(token: &str) -> Option<u32> {
    u32::from_str_radix(token.trim_start_matches("0x"), 16).ok()
}

/// Scans `objdump -d` output of `.boot2`, GNU or LLVM flavoured.
pub fn scan(disassembly: &str) -> Vec<Escape> {
    let mut escapes = Vec::new();
    for line in disassembly.lines() {
        let Some((at, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(at) = hex(at.trim()) else {
            continue;
        };

        let mut tokens = rest.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == ".word" {
                if let Some(value) = tokens.next().and_then(hex) {
                    let allowed = in_block(value) || value == APP_BASE || value == APP_BASE | 1;
                    if XIP_ALIASES.contains(&value) && !allowed {
                        escapes.push(Escape::Literal { at, value });
                    }
                }
                break;
            }
            if is_branch(token) {
                if let Some(target) = tokens.next().and_then(hex) {
                    if !in_block(target) {
                        escapes.push(Escape::Branch { at, target });
                    }
                }
                break;
            }
        }
    }
    escapes
}
