//! Per-hart interrupt lines.
//!
//! Device adapters run on the coordinator thread and must be able to set
//! `mip` bits of any hart; each hart reads and clears its own bits through
//! CSR operations. The lines are one atomic word per hart — the single
//! writer per bit (device asserts, hart clears) needs no lock.
//!
//! The same structure carries the per-hart "re-evaluate pending interrupts
//! next cycle" request flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Interrupt-pending lines and interrupt-check requests for every hart.
#[derive(Debug)]
pub struct IntLines {
    mip: Box<[AtomicU64]>,
    check: Box<[AtomicBool]>,
}

impl IntLines {
    /// Creates lines for `harts` harts, all clear.
    pub fn new(harts: usize) -> Self {
        Self {
            mip: (0..harts).map(|_| AtomicU64::new(0)).collect(),
            check: (0..harts).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Number of harts covered.
    pub fn hart_count(&self) -> usize {
        self.mip.len()
    }

    /// Reads the `mip` word of a hart.
    #[inline]
    pub fn mip(&self, hart: u16) -> u64 {
        self.mip[hart as usize].load(Ordering::Relaxed)
    }

    /// Replaces the `mip` word of a hart, returning the previous value.
    #[inline]
    pub fn swap_mip(&self, hart: u16, val: u64) -> u64 {
        self.mip[hart as usize].swap(val, Ordering::Relaxed)
    }

    /// Sets the given bits in a hart's `mip`.
    #[inline]
    pub fn raise(&self, hart: u16, bits: u64) -> u64 {
        self.mip[hart as usize].fetch_or(bits, Ordering::Relaxed)
    }

    /// Clears the given bits in a hart's `mip`.
    #[inline]
    pub fn clear(&self, hart: u16, bits: u64) -> u64 {
        self.mip[hart as usize].fetch_and(!bits, Ordering::Relaxed)
    }

    /// Requests that a hart re-evaluate pending interrupts.
    #[inline]
    pub fn request_check(&self, hart: u16) {
        self.check[hart as usize].store(true, Ordering::Relaxed);
    }

    /// Requests an interrupt re-evaluation on every hart.
    pub fn request_check_all(&self) {
        for flag in &self.check {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Consumes a hart's pending check request.
    #[inline]
    pub fn take_check(&self, hart: u16) -> bool {
        self.check[hart as usize].swap(false, Ordering::Relaxed)
    }
}
