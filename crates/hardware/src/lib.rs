//! RV64IMAC full-system emulator library.
//!
//! This crate implements a functional emulator for a 64-bit RISC-V machine:
//! 1. **Core:** per-hart fetch/decode/execute with the compressed
//!    extension, M-extension arithmetic, and the A-extension sequencer
//!    with per-hart reservations.
//! 2. **Privileged architecture:** M/S/U modes, the CSR file with its
//!    shadow registers, trap delegation, and interrupt evaluation.
//! 3. **Memory:** Sv39/Sv48/Sv57 translation with a hashed TLB and
//!    superpage support, PMP with an expanded fast path, and a fixed
//!    physical bus.
//! 4. **SoC:** ACLINT (MTIMER/MSWI), PLIC, NS16550A UART, and a stub
//!    virtio-mmio block device.
//! 5. **Simulation:** image loader, console, and the threaded runner.

/// Common types and constants (memory map, access kinds, traps).
pub mod common;

/// Emulator configuration.
pub mod config;

/// The hart: architectural state, MMU, and the cycle driver.
pub mod core;

/// Instruction set tables, the decoder, and the RVC expander.
pub mod isa;

/// Simulation: loader, console, runner.
pub mod sim;

/// System-on-chip: machine aggregate, bus, devices.
pub mod soc;

pub use crate::common::Trap;
pub use crate::config::Config;
pub use crate::core::Hart;
pub use crate::soc::Machine;
