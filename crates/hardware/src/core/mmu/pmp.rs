//! Physical memory protection.
//!
//! Sixteen entries of raw configuration (`pmpcfg`/`pmpaddr`) plus an
//! expanded cache of resolved byte ranges that the hot path queries.
//! Whenever any raw field changes the expanded table must be re-synced
//! before the next memory access; every mutator here does so.
//!
//! Address-matching modes:
//! - **TOR**: region is `[pmpaddr[i-1] << 2, pmpaddr[i] << 2)` (zero base
//!   for entry 0).
//! - **NA4**: four bytes at `pmpaddr[i] << 2`.
//! - **NAPOT**: the trailing ones of `pmpaddr[i]` give the region size;
//!   all-ones covers the whole address space.

use crate::common::constants::PMP_COUNT;
use crate::core::arch::mode::PrivilegeMode;

/// Stored `pmpaddr` registers hold bits 55:2 of the address (54 bits).
pub const PMPADDR_MASK: u64 = 0x003F_FFFF_FFFF_FFFF;

/// Lock bit in a `pmpcfg` byte.
const CFG_L: u8 = 1 << 7;

/// Permission and lock bits of a `pmpcfg` byte (`L | X | W | R`).
const CFG_LXWR: u8 = 0b1000_0111;

/// Read permission in an `lxwr` value.
pub const PMP_R: u8 = 1 << 0;
/// Write permission in an `lxwr` value.
pub const PMP_W: u8 = 1 << 1;
/// Execute permission in an `lxwr` value.
pub const PMP_X: u8 = 1 << 2;

/// Address-matching mode field of a `pmpcfg` byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AddrMatch {
    Off = 0,
    Tor = 1,
    Na4 = 2,
    Napot = 3,
}

impl AddrMatch {
    fn from_cfg(cfg: u8) -> Self {
        match (cfg >> 3) & 0b11 {
            0 => Self::Off,
            1 => Self::Tor,
            2 => Self::Na4,
            _ => Self::Napot,
        }
    }
}

/// An expanded PMP entry: the resolved byte range of one raw entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpPmp {
    /// Entry participates in matching.
    pub enable: bool,
    /// Entry applies to M-mode too.
    pub lock: bool,
    /// Inclusive lower byte bound.
    pub lbound: u64,
    /// Exclusive upper byte bound.
    pub ubound: u64,
    /// `L | X | W | R` bits of the raw configuration.
    pub lxwr: u8,
}

/// Result of a range permission query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PmpRange {
    /// The whole range lies in one entry; its `lxwr` bits.
    Perms(u8),
    /// The range crosses an entry boundary: always an access fault.
    Boundary,
    /// No entry matched (allowed in M-mode, denied below).
    NoMatch,
}

/// The PMP engine of one hart.
#[derive(Clone, Debug)]
pub struct Pmp {
    cfg: [u8; PMP_COUNT],
    addr: [u64; PMP_COUNT],
    locked_addr: [bool; PMP_COUNT],
    expanded: [ExpPmp; PMP_COUNT],
    /// Some unlocked RWX entry spans the whole address space.
    all_enabled: bool,
    /// Tightest extent of the non-RWX entries; addresses outside
    /// `[min_lbound, max_ubound)` short-circuit to RWX when
    /// `all_enabled` holds.
    min_lbound: u64,
    max_ubound: u64,
}

impl Default for Pmp {
    fn default() -> Self {
        Self::new()
    }
}

impl Pmp {
    /// Creates a PMP with every entry off.
    pub fn new() -> Self {
        let mut pmp = Self {
            cfg: [0; PMP_COUNT],
            addr: [0; PMP_COUNT],
            locked_addr: [false; PMP_COUNT],
            expanded: [ExpPmp::default(); PMP_COUNT],
            all_enabled: false,
            min_lbound: u64::MAX,
            max_ubound: 0,
        };
        pmp.sync_expanded();
        pmp
    }

    /// Applies the reset state: entry 0 is a NAPOT region spanning the
    /// whole space with R/W/X.
    pub fn reset(&mut self) {
        *self = Self::new();
        self.addr[0] = PMPADDR_MASK;
        self.cfg[0] = 0b0001_1111;
        self.sync_expanded();
    }

    /// Reads a raw configuration byte.
    pub fn cfg(&self, idx: usize) -> u8 {
        self.cfg[idx]
    }

    /// Reads a raw address register.
    pub fn addr(&self, idx: usize) -> u64 {
        self.addr[idx]
    }

    /// Whether writes to `pmpaddr[idx]` are dropped.
    pub fn addr_locked(&self, idx: usize) -> bool {
        self.locked_addr[idx]
    }

    /// Writes a raw address register unless it is locked.
    pub fn set_addr(&mut self, idx: usize, val: u64) {
        if !self.locked_addr[idx] {
            self.addr[idx] = val & PMPADDR_MASK;
            self.sync_expanded();
        }
    }

    /// Writes a raw configuration byte unless its lock bit is set.
    ///
    /// A write that sets L also locks the matching address register, and
    /// for a TOR entry the address register below it (it forms the base of
    /// the range).
    pub fn set_cfg(&mut self, idx: usize, val: u8) {
        if self.cfg[idx] & CFG_L != 0 {
            return;
        }
        self.cfg[idx] = val;
        if self.cfg[idx] & CFG_L != 0 {
            self.locked_addr[idx] = true;
            if AddrMatch::from_cfg(self.cfg[idx]) == AddrMatch::Tor && idx != 0 {
                self.locked_addr[idx - 1] = true;
            }
        }
        self.sync_expanded();
    }

    /// Resolves the byte range of one raw entry.
    fn entry_range(&self, idx: usize, mode: AddrMatch) -> (u64, u64) {
        match mode {
            AddrMatch::Tor => {
                let lbound = if idx == 0 { 0 } else { self.addr[idx - 1] << 2 };
                (lbound, self.addr[idx] << 2)
            }
            AddrMatch::Na4 => {
                let lbound = self.addr[idx] << 2;
                (lbound, lbound + 4)
            }
            _ => {
                let a = self.addr[idx];
                if a == PMPADDR_MASK {
                    (0, u64::MAX)
                } else {
                    let k = (!a).trailing_zeros() as u64;
                    let lbound = (a >> k) << (k + 2);
                    (lbound, lbound + (1 << (k + 2)))
                }
            }
        }
    }

    /// Rebuilds the expanded entries and the aggregate short-circuit state.
    pub fn sync_expanded(&mut self) {
        self.all_enabled = false;
        self.min_lbound = u64::MAX;
        self.max_ubound = 0;
        for i in 0..PMP_COUNT {
            let mode = AddrMatch::from_cfg(self.cfg[i]);
            if mode == AddrMatch::Off {
                self.expanded[i].enable = false;
                continue;
            }
            let (lbound, ubound) = self.entry_range(i, mode);
            let lxwr = self.cfg[i] & CFG_LXWR;
            self.expanded[i] = ExpPmp {
                enable: true,
                lock: self.cfg[i] & CFG_L != 0,
                lbound,
                ubound,
                lxwr,
            };

            let is_rwx = lxwr == (PMP_R | PMP_W | PMP_X);
            if !is_rwx {
                self.min_lbound = self.min_lbound.min(lbound);
                self.max_ubound = self.max_ubound.max(ubound);
            }
            if lbound == 0 && ubound == u64::MAX && is_rwx {
                self.all_enabled = true;
            }
        }
    }

    /// Point query: the `lxwr` bits of the first matching entry, or `None`
    /// when no entry matched. M-mode only considers locked entries.
    pub fn check(&self, addr: u64, privmode: PrivilegeMode) -> Option<u8> {
        if self.all_enabled && (addr >= self.max_ubound || addr < self.min_lbound) {
            return Some(PMP_R | PMP_W | PMP_X);
        }
        let machine = privmode == PrivilegeMode::Machine;
        for e in &self.expanded {
            if !e.enable || (machine && !e.lock) {
                continue;
            }
            if e.lbound <= addr && addr < e.ubound {
                return Some(e.lxwr);
            }
        }
        None
    }

    /// Range query over the inclusive byte range `[lo, hi]`, treated as a
    /// single access.
    pub fn check_range(&self, lo: u64, hi: u64, privmode: PrivilegeMode) -> PmpRange {
        if self.all_enabled && (lo >= self.max_ubound || hi < self.min_lbound) {
            return PmpRange::Perms(PMP_R | PMP_W | PMP_X);
        }
        let machine = privmode == PrivilegeMode::Machine;
        for e in &self.expanded {
            if !e.enable || (machine && !e.lock) {
                continue;
            }
            let lo_in = e.lbound <= lo && lo < e.ubound;
            let hi_in = e.lbound <= hi && hi < e.ubound;
            if lo_in && hi_in {
                return PmpRange::Perms(e.lxwr);
            }
            if lo_in != hi_in {
                return PmpRange::Boundary;
            }
        }
        PmpRange::NoMatch
    }
}
