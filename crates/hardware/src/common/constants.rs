//! Global system constants.
//!
//! The physical memory map is fixed for this platform; devices are not
//! relocatable. All addresses are physical byte addresses.

/// Page size in bytes (4 KiB).
pub const PAGE_SIZE: u64 = 4096;

/// Number of bits in the page offset.
pub const PAGE_SHIFT: u64 = 12;

/// Number of virtual-address bits translated per page-table level.
pub const VPN_BITS_PER_LEVEL: u64 = 9;

/// Start of guest RAM.
pub const RAM_BASE: u64 = 0x8000_0000;

/// Default guest RAM size (512 MiB).
pub const DEFAULT_RAM_SIZE: u64 = 0x2000_0000;

/// Base of the 12-byte boot ROM.
pub const BOOT_ROM_BASE: u64 = 0x1000;

/// Length of the boot ROM in bytes.
pub const BOOT_ROM_LEN: u64 = 12;

/// Physical address the device tree blob is mapped at.
pub const DTB_BASE: u64 = 0x1100;

/// Maximum supported device tree blob size.
pub const MAX_DTB_SIZE: u64 = 32768;

/// Base of the ACLINT MSWI register block.
pub const MSWI_BASE: u64 = 0x200_0000;

/// Size of the ACLINT MSWI register block.
pub const MSWI_SIZE: u64 = 0x4000;

/// Base of the ACLINT MTIMER register block.
pub const MTIMER_BASE: u64 = 0x200_4000;

/// Size of the ACLINT MTIMER register block.
pub const MTIMER_SIZE: u64 = 0x8000;

/// Base of the platform-level interrupt controller.
pub const PLIC_BASE: u64 = 0xC00_0000;

/// Size of the PLIC register space.
pub const PLIC_SIZE: u64 = 0x400_0000;

/// Base of the NS16550A UART.
pub const UART_BASE: u64 = 0x1000_0000;

/// Size of the UART register file.
pub const UART_SIZE: u64 = 16;

/// Base of the virtio-mmio block device.
pub const VIRTIO_BLK_BASE: u64 = 0x1000_1000;

/// Size of the virtio-mmio register window.
pub const VIRTIO_BLK_SIZE: u64 = 0x1000;

/// Accesses below this physical address always fault.
pub const RESERVED_LOW_LIMIT: u64 = 0x1000;

/// Number of PMP entries.
pub const PMP_COUNT: usize = 16;

/// Number of TLB slots per hart.
pub const TLB_SIZE: usize = 64;

/// Bit mask indicating that a trap cause represents an interrupt.
pub const CAUSE_INTERRUPT_BIT: u64 = 1 << 63;

/// Raw instruction word that halts a hart in signature mode
/// (`sltiu x0, t1, 0xbad` — a HINT encoding reserved for custom use).
pub const SIGNATURE_HALT_WORD: u32 = 0xBAD3_3013;

/// Offset of the signature region from the start of RAM.
pub const SIGNATURE_OFFSET: u64 = 0xF0_0000;

/// Length of the signature region in bytes.
pub const SIGNATURE_LEN: usize = 512;

/// The boot ROM: `addi x8, x0, 1; slli x8, x8, 31; jalr x0, x8, 0`,
/// jumping to the start of RAM.
pub const BOOT_ROM: [u8; BOOT_ROM_LEN as usize] = [
    0x13, 0x04, 0x10, 0x00, // addi x8, x0, 1
    0x13, 0x14, 0xf4, 0x01, // slli x8, x8, 31
    0x67, 0x00, 0x04, 0x00, // jalr x0, x8, 0x0
];
