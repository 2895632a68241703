//! ACLINT: machine timer (MTIMER) and machine software interrupts (MSWI).
//!
//! # Memory Map
//!
//! MTIMER block (from its own base):
//! * `8·h` — `mtimecmp` for hart `h`
//! * `0x7FF8` — `mtime`
//!
//! MSWI block (from its own base):
//! * `4·h` — `msip` for hart `h`, bit 0 only
//!
//! `mtime` counts at 10 MHz derived from the host wall clock, or once per
//! retired cycle in slow-timer configurations (deterministic runs).

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use crate::core::arch::csr::{INT_MSIP, INT_MTIP};
use crate::soc::intr::IntLines;
use crate::soc::lock;

/// Offset of the `mtime` register inside the MTIMER block.
const MTIME_OFFSET: u64 = 0x7FF8;

/// Nanoseconds per `mtime` tick (10 MHz).
const NS_PER_TICK: u64 = 100;

/// Combined ACLINT device state.
#[derive(Debug)]
pub struct Aclint {
    /// Wall-clock origin of `mtime`; writing `mtime` moves it.
    epoch: Mutex<Instant>,
    /// Synthetic counter used instead of the wall clock in slow mode.
    slow_time: AtomicU64,
    /// True when `mtime` ticks per cycle instead of wall clock.
    slow: bool,
    /// Per-hart timer compare registers; `u64::MAX` disarms.
    mtimecmp: Box<[AtomicU64]>,
    /// Per-hart software-interrupt registers (bit 0 only).
    msip: Box<[AtomicU32]>,
}

impl Aclint {
    /// Creates the ACLINT for `harts` harts.
    pub fn new(harts: usize, slow: bool) -> Self {
        Self {
            epoch: Mutex::new(Instant::now()),
            slow_time: AtomicU64::new(0),
            slow,
            mtimecmp: (0..harts).map(|_| AtomicU64::new(u64::MAX)).collect(),
            msip: (0..harts).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Current `mtime` value.
    pub fn mtime(&self) -> u64 {
        if self.slow {
            self.slow_time.load(Ordering::Relaxed)
        } else {
            lock(&self.epoch).elapsed().as_nanos() as u64 / NS_PER_TICK
        }
    }

    /// Rebases `mtime` so it reads `val` now.
    pub fn set_mtime(&self, val: u64) {
        if self.slow {
            self.slow_time.store(val, Ordering::Relaxed);
        } else {
            let mut epoch = lock(&self.epoch);
            let now = Instant::now();
            *epoch = now
                .checked_sub(std::time::Duration::from_nanos(val.saturating_mul(NS_PER_TICK)))
                .unwrap_or(now);
        }
    }

    /// Advances the synthetic clock by one tick (slow mode only).
    pub fn tick_slow(&self) {
        if self.slow {
            self.slow_time.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Re-evaluates the timer-pending line of one hart.
    pub fn check_timer(&self, hart: u16, lines: &IntLines) {
        if hart as usize >= self.mtimecmp.len() {
            return;
        }
        if self.mtimecmp[hart as usize].load(Ordering::Relaxed) <= self.mtime() {
            lines.raise(hart, INT_MTIP);
        } else {
            lines.clear(hart, INT_MTIP);
        }
    }

    /// Raises the software-interrupt line of one hart if its `msip` is set.
    ///
    /// The line is only ever asserted here; the guest clears `mip.MSIP`
    /// through CSR writes.
    pub fn check_swi(&self, hart: u16, lines: &IntLines) {
        if (hart as usize) < self.msip.len()
            && self.msip[hart as usize].load(Ordering::Relaxed) != 0
        {
            lines.raise(hart, INT_MSIP);
        }
    }

    /// MMIO read from the MTIMER block.
    pub fn mtimer_load(&self, offset: u64) -> u64 {
        if offset == MTIME_OFFSET {
            return self.mtime();
        }
        let hart = (offset / 8) as usize;
        if hart < self.mtimecmp.len() {
            self.mtimecmp[hart].load(Ordering::Relaxed)
        } else {
            0
        }
    }

    /// MMIO write to the MTIMER block.
    ///
    /// An `mtimecmp` update immediately re-evaluates the owning hart's
    /// timer-pending line; the guest relies on this to acknowledge the
    /// interrupt.
    pub fn mtimer_store(&self, offset: u64, val: u64, lines: &IntLines) {
        if offset == MTIME_OFFSET {
            self.set_mtime(val);
            return;
        }
        let hart = offset / 8;
        if (hart as usize) < self.mtimecmp.len() {
            self.mtimecmp[hart as usize].store(val, Ordering::Relaxed);
            self.check_timer(hart as u16, lines);
        }
    }

    /// MMIO read from the MSWI block.
    pub fn mswi_load(&self, offset: u64) -> u64 {
        let hart = (offset / 4) as usize;
        if hart < self.msip.len() {
            self.msip[hart].load(Ordering::Relaxed) as u64
        } else {
            0
        }
    }

    /// MMIO write to the MSWI block; only bit 0 is writable.
    pub fn mswi_store(&self, offset: u64, val: u64, lines: &IntLines) {
        let hart = offset / 4;
        if (hart as usize) < self.msip.len() {
            self.msip[hart as usize].store((val & 1) as u32, Ordering::Relaxed);
            self.check_swi(hart as u16, lines);
        }
    }
}
