//! Binary image loading.
//!
//! Firmware and kernel images may be ELF or raw. ELF images are parsed with
//! the `object` crate and their `PT_LOAD` segments placed at their physical
//! addresses (plus the caller's offset); anything unparseable is treated as
//! a raw binary. In signature mode the ELF symbol table is scanned for
//! `begin_signature`/`end_signature` to bound the signature dump.

use std::fs;
use std::io;
use std::path::Path;

use object::Endianness;
use object::elf::PT_LOAD;
use object::read::elf::{ElfFile64, ProgramHeader};
use object::{Object, ObjectSymbol};
use thiserror::Error;

use crate::common::constants::{DTB_BASE, MAX_DTB_SIZE, RAM_BASE};
use crate::soc::Machine;

/// Which image a load failure refers to; selects the process exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    /// Firmware (`-f`).
    Firmware,
    /// Kernel (`-k`).
    Kernel,
    /// Device tree blob (`-d`).
    Dtb,
    /// Initial ramdisk (`-i`).
    Initrd,
}

impl ImageKind {
    /// The documented process exit code for a failure on this image.
    pub fn exit_code(self) -> i32 {
        match self {
            ImageKind::Firmware => 1,
            ImageKind::Kernel => 2,
            ImageKind::Dtb => 3,
            ImageKind::Initrd => 4,
        }
    }
}

/// Image loading failure.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image file could not be read.
    #[error("could not read {kind:?} image {path}: {source}")]
    Open {
        /// Which image.
        kind: ImageKind,
        /// The offending path.
        path: String,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// The image does not fit its target region.
    #[error("{kind:?} image {path} does not fit in guest memory")]
    TooLarge {
        /// Which image.
        kind: ImageKind,
        /// The offending path.
        path: String,
    },
}

impl LoadError {
    /// The documented process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::Open { kind, .. } | LoadError::TooLarge { kind, .. } => kind.exit_code(),
        }
    }
}

/// Signature region discovered from ELF symbols.
#[derive(Clone, Copy, Debug)]
pub struct SignatureBounds {
    /// Physical address of `begin_signature`.
    pub begin: u64,
    /// Physical address of `end_signature`.
    pub end: u64,
}

/// The images to place in guest memory before boot.
#[derive(Clone, Debug, Default)]
pub struct BootImages {
    /// Firmware path; `None` boots the kernel directly.
    pub firmware: Option<String>,
    /// Kernel path.
    pub kernel: Option<String>,
    /// Initrd path.
    pub initrd: Option<String>,
    /// Device tree blob path.
    pub dtb: Option<String>,
}

/// Offset past the firmware where the kernel lands.
const KERNEL_OFFSET: u64 = 0x20_0000;

/// Offset from RAM base where the initrd lands.
const INITRD_OFFSET: u64 = 0x820_0000;

/// Loads all boot images into the machine.
///
/// With firmware: firmware at the RAM base, kernel `0x200000` beyond it.
/// Without: the kernel is placed directly at the RAM base. The initrd is
/// raw at RAM + `0x8200000`; the DTB lands in its dedicated buffer at
/// physical `0x1100` (truncated to the buffer size).
///
/// Returns the signature bounds if an ELF image carried the signature
/// symbols and `signature_mode` is set.
pub fn load_boot_images(
    machine: &Machine,
    images: &BootImages,
    signature_mode: bool,
) -> Result<Option<SignatureBounds>, LoadError> {
    let mut sig = None;

    if let Some(ref fw) = images.firmware {
        load_image(machine, ImageKind::Firmware, fw, 0, signature_mode, &mut sig)?;
        if let Some(ref kernel) = images.kernel {
            load_image(
                machine,
                ImageKind::Kernel,
                kernel,
                KERNEL_OFFSET,
                signature_mode,
                &mut sig,
            )?;
        }
    } else if let Some(ref kernel) = images.kernel {
        load_image(machine, ImageKind::Kernel, kernel, 0, signature_mode, &mut sig)?;
    }

    if let Some(ref initrd) = images.initrd {
        let data = read_file(ImageKind::Initrd, initrd)?;
        if !machine.load_blob(RAM_BASE + INITRD_OFFSET, &data) {
            return Err(LoadError::TooLarge {
                kind: ImageKind::Initrd,
                path: initrd.clone(),
            });
        }
        tracing::debug!(path = %initrd, size = data.len(), "initrd loaded");
    }

    if let Some(ref dtb) = images.dtb {
        let mut data = read_file(ImageKind::Dtb, dtb)?;
        data.truncate(MAX_DTB_SIZE as usize);
        let _ = machine.load_blob(DTB_BASE, &data);
        tracing::debug!(path = %dtb, size = data.len(), "dtb loaded");
    }

    Ok(sig)
}

fn read_file(kind: ImageKind, path: &str) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| LoadError::Open {
        kind,
        path: path.to_string(),
        source,
    })
}

/// Loads one ELF-or-raw image shifted by `mem_offset`.
fn load_image(
    machine: &Machine,
    kind: ImageKind,
    path: &str,
    mem_offset: u64,
    signature_mode: bool,
    sig: &mut Option<SignatureBounds>,
) -> Result<(), LoadError> {
    let data = read_file(kind, path)?;

    match ElfFile64::<Endianness>::parse(&*data) {
        Ok(elf) => {
            let endian = elf.endian();
            let mut loaded = 0usize;
            for ph in elf.elf_program_headers() {
                if ph.p_type(endian) != PT_LOAD {
                    continue;
                }
                let paddr = ph.p_paddr(endian);
                if paddr < RAM_BASE {
                    continue;
                }
                let bytes = ph.data(endian, &*data).unwrap_or(&[]);
                if !machine.load_blob(paddr + mem_offset, bytes) {
                    return Err(LoadError::TooLarge {
                        kind,
                        path: path.to_string(),
                    });
                }
                loaded += bytes.len();
            }
            tracing::debug!(path, size = loaded, "ELF image loaded");

            if signature_mode {
                let mut begin = None;
                let mut end = None;
                for sym in elf.symbols() {
                    match sym.name() {
                        Ok("begin_signature") => begin = Some(sym.address()),
                        Ok("end_signature") => end = Some(sym.address()),
                        _ => {}
                    }
                }
                if let (Some(begin), Some(end)) = (begin, end) {
                    tracing::debug!(begin = format_args!("{:#x}", begin), end = format_args!("{:#x}", end), "signature region");
                    *sig = Some(SignatureBounds { begin, end });
                }
            }
        }
        Err(_) => {
            // Not an ELF: flat binary at the base plus offset.
            if !machine.load_blob(RAM_BASE + mem_offset, &data) {
                return Err(LoadError::TooLarge {
                    kind,
                    path: path.to_string(),
                });
            }
            tracing::debug!(path, size = data.len(), "raw image loaded");
        }
    }
    Ok(())
}
