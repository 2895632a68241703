//! Memory-mapped peripherals.
//!
//! Every device exposes width-parametric `load`/`store` entry points with
//! device-relative offsets and uses interior mutability, because MMIO
//! arrives from whichever hart thread executes the access while the
//! coordinator thread ticks device housekeeping. Devices that raise
//! interrupts take the machine's [`IntLines`](crate::soc::intr::IntLines)
//! as an argument rather than holding hart references.

/// ACLINT machine timer and software-interrupt blocks.
pub mod clint;

/// Platform-level interrupt controller.
pub mod plic;

/// NS16550A-compatible UART.
pub mod uart;

/// virtio-mmio block device (register stub).
pub mod virtio;

pub use clint::Aclint;
pub use plic::Plic;
pub use uart::Uart;
pub use virtio::VirtioBlk;
