//! Seals a boot stage 2 binary for the RP2040 mask ROM.
//!
//! The payload is zero-padded to 252 bytes and followed by its CRC32/MPEG-2. The result is
//! emitted as Rust source: either the whole 256-byte block, or only the 4 checksum bytes for a
//! boot stage that is linked into the firmware itself. `--check` goes the other way and tells
//! whether the first 256 bytes of a flash image carry a checksum the ROM accepts.

mod render;

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use bringup::image::{self, BLOCK_SIZE, ImageError, PAYLOAD_SIZE};
use clap::Parser;
use log::{debug, info};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "trailer", version, about = "Append the boot ROM checksum to a boot stage")]
struct Args {
    /// Raw boot stage, at most 252 bytes. With `--check`, a flash image.
    input: PathBuf,

    /// Only emit the 4-byte checksum (`boot2_crc.rs`) instead of the whole block (`boot2.rs`).
    #[arg(long)]
    crc_only: bool,

    /// Verify the boot block at the start of the input instead of sealing it. Writes nothing.
    #[arg(long, conflicts_with_all = ["crc_only", "output"])]
    check: bool,

    /// Where to write the generated source. Defaults to the input's directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum TrailerError {
    #[error("{}: expected a .bin file", .0.display())]
    NotBin(PathBuf),
    #[error("{}: no such file", .0.display())]
    Missing(PathBuf),
    #[error("{}: {source}", .path.display())]
    Image { path: PathBuf, source: ImageError },
    #[error("{}: shorter than a boot block", .0.display())]
    Short(PathBuf),
    #[error("{}: boot block checksum does not match, the ROM will not run it", .0.display())]
    StaleCrc(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let result = if args.check {
        check(&args.input).map(|()| info!("{}: checksum ok", args.input.display()))
    } else {
        run(&args).map(|path| info!("wrote {}", path.display()))
    };
    match result {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

/// Seals `args.input` and writes the generated source, returning its path.
///
/// Every check happens before anything is written.
fn run(args: &Args) -> Result<PathBuf, TrailerError> {
    let input = &args.input;
    validate(input)?;

    let len = fs::metadata(input)?.len();
    if len > PAYLOAD_SIZE as u64 {
        return Err(TrailerError::Image {
            path: input.clone(),
            source: ImageError::PayloadTooLarge(usize::try_from(len).unwrap_or(usize::MAX)),
        });
    }

    let payload = fs::read(input)?;
    debug!("{}: {} of {PAYLOAD_SIZE} bytes", input.display(), payload.len());
    let block = image::seal(&payload).map_err(|source| TrailerError::Image {
        path: input.clone(),
        source,
    })?;
    let crc = render::crc(&block);
    info!("checksum {:#010x}", u32::from_le_bytes(crc));

    let (source, name) = if args.crc_only {
        (render::crc_source(crc), "boot2_crc.rs")
    } else {
        (render::block_source(&block), "boot2.rs")
    };
    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output(input, name),
    };
    fs::write(&output, source)?;
    Ok(output)
}

/// Checks the boot block at the start of `input`, the rest of the image is ignored.
fn check(input: &Path) -> Result<(), TrailerError> {
    validate(input)?;

    let mut block = [0; BLOCK_SIZE];
    File::open(input)?
        .read_exact(&mut block)
        .map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => TrailerError::Short(input.to_path_buf()),
            _ => TrailerError::Io(err),
        })?;
    debug!("{}: trailer {:02x?}", input.display(), &block[PAYLOAD_SIZE..]);

    if !image::verify(&block) {
        return Err(TrailerError::StaleCrc(input.to_path_buf()));
    }
    Ok(())
}

fn validate(input: &Path) -> Result<(), TrailerError> {
    if input.extension().is_none_or(|ext| ext != "bin") {
        return Err(TrailerError::NotBin(input.to_path_buf()));
    }
    if !input.is_file() {
        return Err(TrailerError::Missing(input.to_path_buf()));
    }
    Ok(())
}

fn default_output(input: &Path, name: &str) -> PathBuf {
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(input: PathBuf, crc_only: bool) -> Args {
        Args {
            input,
            crc_only,
            check: false,
            output: None,
        }
    }

    #[test]
    fn seals_a_small_payload() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("stage2.bin");
        let payload: Vec<u8> = (1..=10).collect();
        fs::write(&input, &payload).unwrap();

        let output = run(&args(input, false)).unwrap();
        assert_eq!(output, dir.path().join("boot2.rs"));

        let source = fs::read_to_string(&output).unwrap();
        let block = image::seal(&payload).unwrap();
        assert!(source.contains("#[unsafe(link_section = \".boot2\")]"));
        assert!(source.contains("[u8; 256]"));
        assert!(source.contains(
            "    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,\n"
        ));
        let crc = &block[PAYLOAD_SIZE..];
        let last = format!(
            "0x{:02x}, 0x{:02x}, 0x{:02x}, 0x{:02x},\n];",
            crc[0], crc[1], crc[2], crc[3]
        );
        assert!(source.contains(&last), "{source}");
    }

    #[test]
    fn crc_only() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("boot2.bin");
        fs::write(&input, [0u8; 252]).unwrap();

        let output = run(&args(input, true)).unwrap();
        assert_eq!(output, dir.path().join("boot2_crc.rs"));

        let source = fs::read_to_string(&output).unwrap();
        let block = image::seal(&[0u8; 252]).unwrap();
        assert!(source.contains("#[unsafe(link_section = \".boot2_crc\")]"));
        assert!(source.contains(&format!(
            "pub static BOOT2_CRC: [u8; 4] = [0x{:02x}, 0x{:02x}, 0x{:02x}, 0x{:02x}];",
            block[252], block[253], block[254], block[255]
        )));
    }

    #[test]
    fn explicit_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("boot2.bin");
        fs::write(&input, [0xffu8; 4]).unwrap();
        let target = dir.path().join("out.rs");

        let output = run(&Args {
            input,
            crc_only: false,
            check: false,
            output: Some(target.clone()),
        })
        .unwrap();

        assert_eq!(output, target);
        assert!(target.is_file());
    }

    #[test]
    fn oversize_payload_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("big.bin");
        fs::write(&input, [0u8; 300]).unwrap();

        let err = run(&args(input, false)).unwrap_err();
        assert!(matches!(
            err,
            TrailerError::Image {
                source: ImageError::PayloadTooLarge(300),
                ..
            }
        ));
        assert!(!dir.path().join("boot2.rs").exists());
    }

    #[test]
    fn size_is_checked_before_reading() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("huge.bin");
        // Sparse: reading it whole would take a while.
        File::create(&input).unwrap().set_len(1 << 30).unwrap();

        let err = run(&args(input, true)).unwrap_err();
        assert!(matches!(
            err,
            TrailerError::Image {
                source: ImageError::PayloadTooLarge(0x4000_0000),
                ..
            }
        ));
        assert!(!dir.path().join("boot2_crc.rs").exists());
    }

    #[test]
    fn check_accepts_a_sealed_image() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("xipblink.bin");
        let mut flash = image::seal(b"boot stage").unwrap().to_vec();
        // The application follows, it is not part of the checksum.
        flash.extend_from_slice(&[0xa5; 1024]);
        fs::write(&input, &flash).unwrap();

        check(&input).unwrap();
    }

    #[test]
    fn check_rejects_a_stale_crc() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("xipblink.bin");
        let mut block = image::seal(b"boot stage").unwrap();
        // A placeholder trailer, as checked in before the first regeneration.
        block[PAYLOAD_SIZE..].fill(0);
        fs::write(&input, block).unwrap();

        let err = check(&input).unwrap_err();
        assert!(matches!(err, TrailerError::StaleCrc(_)));

        // A boot stage edited after sealing.
        let mut block = image::seal(b"boot stage").unwrap();
        block[0] ^= 0x80;
        fs::write(&input, block).unwrap();
        assert!(matches!(check(&input), Err(TrailerError::StaleCrc(_))));
    }

    #[test]
    fn check_needs_a_whole_block() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("short.bin");
        fs::write(&input, [0u8; 100]).unwrap();

        assert!(matches!(check(&input), Err(TrailerError::Short(_))));
    }

    #[test]
    fn rejects_other_extensions() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("boot2.elf");
        fs::write(&input, [0u8; 4]).unwrap();

        let err = run(&args(input, false)).unwrap_err();
        assert!(matches!(err, TrailerError::NotBin(_)));
        assert!(!dir.path().join("boot2.rs").exists());
    }

    #[test]
    fn rejects_missing_input() {
        let dir = tempdir().unwrap();
        let err = run(&args(dir.path().join("absent.bin"), false)).unwrap_err();
        assert!(matches!(err, TrailerError::Missing(_)));
        assert!(err.to_string().ends_with("absent.bin: no such file"));
    }

    #[test]
    fn cli_requires_an_input() {
        assert!(Args::try_parse_from(["trailer"]).is_err());
        assert!(Args::try_parse_from(["trailer", "a.bin", "b.bin"]).is_err());

        let args = Args::try_parse_from(["trailer", "--crc-only", "-o", "x.rs", "a.bin"]).unwrap();
        assert!(args.crc_only);
        assert_eq!(args.output, Some(PathBuf::from("x.rs")));

        let args = Args::try_parse_from(["trailer", "--check", "image.bin"]).unwrap();
        assert!(args.check);
        assert!(Args::try_parse_from(["trailer", "--check", "--crc-only", "a.bin"]).is_err());
        assert!(Args::try_parse_from(["trailer", "--check", "-o", "x.rs", "a.bin"]).is_err());
    }
}
