//! System-on-chip: the shared machine aggregate, physical bus, and devices.

/// Physical address routing.
pub mod bus;

/// Memory-mapped peripherals.
pub mod devices;

/// Per-hart interrupt lines.
pub mod intr;

/// Guest RAM buffer.
pub mod memory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::common::constants::{MAX_DTB_SIZE, RAM_BASE};
use crate::config::Config;
use crate::soc::devices::{Aclint, Plic, Uart, VirtioBlk};
use crate::soc::intr::IntLines;
use crate::soc::memory::RamBuffer;

/// Acquires a mutex, ignoring poisoning.
///
/// A panicking hart thread must not wedge the others or the coordinator;
/// the protected device state stays usable.
pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything shared between hart threads, devices, and the coordinator.
///
/// Constructed once at startup and handed to each hart by `Arc`. Devices
/// hold no hart references; they raise interrupts through [`IntLines`].
#[derive(Debug)]
pub struct Machine {
    config: Config,
    /// Guest RAM.
    pub ram: RamBuffer,
    /// Device tree blob buffer, mapped read/write at its fixed address.
    pub dtb: RamBuffer,
    /// ACLINT timer and software-interrupt blocks.
    pub clint: Aclint,
    /// Platform-level interrupt controller.
    pub plic: Plic,
    /// Console UART.
    pub uart: Uart,
    /// virtio-mmio block device stub.
    pub vblk: VirtioBlk,
    /// Per-hart LR/SC reservation slots (0 = none). The mutex doubles as
    /// the global atomic-sequence lock: every LR/SC/AMO holds it for the
    /// duration of the operation.
    pub reservations: Mutex<Box<[u64]>>,
    /// Interrupt-pending lines and check requests.
    pub lines: IntLines,
    halted: AtomicBool,
}

impl Machine {
    /// Builds the machine described by `config`.
    pub fn new(config: Config) -> Arc<Self> {
        let harts = config.machine.hart_count.max(1) as usize;
        let ram_size = config.machine.ram_size as usize;
        let slow = config.timer.slow_mtimer;
        Arc::new(Self {
            ram: RamBuffer::new(ram_size),
            dtb: RamBuffer::new(MAX_DTB_SIZE as usize),
            clint: Aclint::new(harts, slow),
            plic: Plic::new(harts),
            uart: Uart::new(),
            vblk: VirtioBlk::new(),
            reservations: Mutex::new(vec![0u64; harts].into_boxed_slice()),
            lines: IntLines::new(harts),
            halted: AtomicBool::new(false),
            config,
        })
    }

    /// The configuration the machine was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of harts.
    pub fn hart_count(&self) -> u16 {
        self.lines.hart_count() as u16
    }

    /// One past the last valid RAM address.
    pub fn ram_end(&self) -> u64 {
        RAM_BASE + self.ram.len() as u64
    }

    /// Requests shutdown; hart threads observe this between cycles.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Relaxed);
        self.uart.shutdown();
    }

    /// Whether shutdown has been requested.
    pub fn halted(&self) -> bool {
        self.halted.load(Ordering::Relaxed)
    }

    /// Periodic device housekeeping, run from the coordinator thread:
    /// re-evaluates every hart's timer and software-interrupt lines and
    /// re-dispatches pending PLIC sources.
    pub fn tick_devices(&self) {
        for hart in 0..self.hart_count() {
            self.clint.check_timer(hart, &self.lines);
            self.clint.check_swi(hart, &self.lines);
        }
        self.plic.dispatch_pending(&self.lines);
    }

    /// Clears any reservation held on `phys_addr` by a hart other than
    /// `owner`, then records it for `owner`. Caller must hold the
    /// reservation lock.
    pub fn take_reservation(res: &mut [u64], owner: u16, phys_addr: u64) {
        for (hart, slot) in res.iter_mut().enumerate() {
            if hart != owner as usize && *slot == phys_addr {
                *slot = 0;
            }
        }
        res[owner as usize] = phys_addr;
    }
}
