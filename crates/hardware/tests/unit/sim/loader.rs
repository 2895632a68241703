//! Loader tests: raw and ELF placement, DTB handling, and error codes.

use std::io::Write;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use crate::common::test_machine;
use rvhart_core::common::constants::{DTB_BASE, RAM_BASE};
use rvhart_core::sim::loader::{BootImages, LoadError, load_boot_images};

fn temp_with(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

fn path_of(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}

/// Builds a minimal little-endian RV64 ELF with one PT_LOAD segment.
fn minimal_elf(paddr: u64, payload: &[u8]) -> Vec<u8> {
    let mut elf = Vec::new();
    // e_ident
    elf.extend_from_slice(&[0x7F, b'E', b'L', b'F', 2, 1, 1, 0]);
    elf.extend_from_slice(&[0; 8]);
    elf.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    elf.extend_from_slice(&243u16.to_le_bytes()); // EM_RISCV
    elf.extend_from_slice(&1u32.to_le_bytes()); // e_version
    elf.extend_from_slice(&paddr.to_le_bytes()); // e_entry
    elf.extend_from_slice(&64u64.to_le_bytes()); // e_phoff
    elf.extend_from_slice(&0u64.to_le_bytes()); // e_shoff
    elf.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    elf.extend_from_slice(&64u16.to_le_bytes()); // e_ehsize
    elf.extend_from_slice(&56u16.to_le_bytes()); // e_phentsize
    elf.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
    elf.extend_from_slice(&[0u8; 6]); // e_shentsize/e_shnum/e_shstrndx

    let data_off = 64u64 + 56;
    elf.extend_from_slice(&1u32.to_le_bytes()); // PT_LOAD
    elf.extend_from_slice(&5u32.to_le_bytes()); // R + X
    elf.extend_from_slice(&data_off.to_le_bytes()); // p_offset
    elf.extend_from_slice(&paddr.to_le_bytes()); // p_vaddr
    elf.extend_from_slice(&paddr.to_le_bytes()); // p_paddr
    elf.extend_from_slice(&(payload.len() as u64).to_le_bytes()); // p_filesz
    elf.extend_from_slice(&(payload.len() as u64).to_le_bytes()); // p_memsz
    elf.extend_from_slice(&0x1000u64.to_le_bytes()); // p_align

    elf.extend_from_slice(payload);
    elf
}

#[test]
fn raw_kernel_loads_at_the_ram_base() {
    let machine = test_machine();
    let kernel = temp_with(&[0x13, 0x05, 0x10, 0x00]);
    let images = BootImages {
        kernel: Some(path_of(&kernel)),
        ..Default::default()
    };

    load_boot_images(&machine, &images, false).unwrap();
    assert_eq!(machine.phys_load(RAM_BASE, 4).unwrap(), 0x0010_0513);
}

#[test]
fn kernel_lands_past_the_firmware() {
    let machine = test_machine();
    let firmware = temp_with(b"FWFW");
    let kernel = temp_with(b"KERN");
    let images = BootImages {
        firmware: Some(path_of(&firmware)),
        kernel: Some(path_of(&kernel)),
        ..Default::default()
    };

    load_boot_images(&machine, &images, false).unwrap();
    assert_eq!(machine.phys_load(RAM_BASE, 4).unwrap(), u32::from_le_bytes(*b"FWFW") as u64);
    assert_eq!(
        machine.phys_load(RAM_BASE + 0x20_0000, 4).unwrap(),
        u32::from_le_bytes(*b"KERN") as u64
    );
}

#[test]
fn elf_segments_load_at_their_physical_address() {
    let machine = test_machine();
    let elf = minimal_elf(RAM_BASE + 0x1000, &[0xAA, 0xBB, 0xCC, 0xDD]);
    let kernel = temp_with(&elf);
    let images = BootImages {
        kernel: Some(path_of(&kernel)),
        ..Default::default()
    };

    load_boot_images(&machine, &images, false).unwrap();
    assert_eq!(
        machine.phys_load(RAM_BASE + 0x1000, 4).unwrap(),
        0xDDCC_BBAA
    );
    // Nothing lands at the base: the ELF header is not a raw image.
    assert_eq!(machine.phys_load(RAM_BASE, 4).unwrap(), 0);
}

#[test]
fn dtb_lands_in_its_window() {
    let machine = test_machine();
    let kernel = temp_with(b"K");
    let dtb = temp_with(&0xD00D_FEEDu32.to_be_bytes());
    let images = BootImages {
        kernel: Some(path_of(&kernel)),
        dtb: Some(path_of(&dtb)),
        ..Default::default()
    };

    load_boot_images(&machine, &images, false).unwrap();
    assert_eq!(machine.phys_load(DTB_BASE, 1).unwrap(), 0xD0);
    assert_eq!(machine.phys_load(DTB_BASE + 3, 1).unwrap(), 0xED);
}

#[test]
fn missing_images_map_to_their_exit_codes() {
    let machine = test_machine();
    let images = BootImages {
        kernel: Some("/nonexistent/kernel".into()),
        ..Default::default()
    };
    let err = load_boot_images(&machine, &images, false).unwrap_err();
    assert!(matches!(err, LoadError::Open { .. }));
    assert_eq!(err.exit_code(), 2);

    let kernel = temp_with(b"K");
    let images = BootImages {
        kernel: Some(path_of(&kernel)),
        initrd: Some("/nonexistent/initrd".into()),
        ..Default::default()
    };
    let err = load_boot_images(&machine, &images, false).unwrap_err();
    assert_eq!(err.exit_code(), 4);

    let images = BootImages {
        firmware: Some("/nonexistent/fw".into()),
        kernel: Some(path_of(&kernel)),
        ..Default::default()
    };
    let err = load_boot_images(&machine, &images, false).unwrap_err();
    assert_eq!(err.exit_code(), 1);

    let images = BootImages {
        kernel: Some(path_of(&kernel)),
        dtb: Some("/nonexistent/dtb".into()),
        ..Default::default()
    };
    let err = load_boot_images(&machine, &images, false).unwrap_err();
    assert_eq!(err.exit_code(), 3);
}
