//! Translation lookaside buffer.
//!
//! A fixed-size open-addressed hash table of recently walked translations.
//! Superpages are first-class: an entry's `size` is the number of trailing
//! page-table levels the leaf skipped (0 = 4 KiB, 1 = 2 MiB, ...), and
//! lookups probe each size present in the table, largest first. The
//! permission/SUM checks and accessed/dirty maintenance on a hit live in
//! the hart's memory layer, which owns the required bus access.

use crate::common::constants::TLB_SIZE;

/// Fibonacci-style hash multiplier (golden-ratio approximation over 2^16).
const HASH_MULTIPLIER: u64 = 0x19E77;

/// Read permission bit of a cached translation (PTE bits 3:1).
pub const TLB_PERM_R: u8 = 0b001;
/// Write permission bit of a cached translation.
pub const TLB_PERM_W: u8 = 0b010;
/// Execute permission bit of a cached translation.
pub const TLB_PERM_X: u8 = 0b100;

/// One cached translation.
///
/// `permissions == 0` marks the slot empty; `virt_page` keeps its low
/// `12 + 9·size` bits clear.
#[derive(Clone, Copy, Debug, Default)]
pub struct TlbEntry {
    /// Size-aligned virtual page base.
    pub virt_page: u64,
    /// Physical page base address of the leaf.
    pub phy_page: u64,
    /// Physical address of the leaf PTE, for accessed/dirty updates.
    pub pte_addr: u64,
    /// Number of trailing levels skipped (0 = 4 KiB leaf).
    pub size: u8,
    /// R/W/X bits of the leaf (PTE bits 3:1); 0 = invalid slot.
    pub permissions: u8,
    /// U bit of the leaf.
    pub user: bool,
}

/// The per-hart TLB.
#[derive(Clone, Debug)]
pub struct Tlb {
    entries: [TlbEntry; TLB_SIZE],
    /// Number of live entries per size; bounds lookup to sizes in use.
    size_count: [u8; 6],
    max_entry_size: i8,
}

impl Default for Tlb {
    fn default() -> Self {
        Self::new()
    }
}

impl Tlb {
    /// Creates an empty TLB.
    pub fn new() -> Self {
        Self {
            entries: [TlbEntry::default(); TLB_SIZE],
            size_count: [0; 6],
            max_entry_size: 0,
        }
    }

    /// Invalidates every entry (SFENCE.VMA).
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn hash(page: u64) -> usize {
        ((HASH_MULTIPLIER.wrapping_mul(page)) >> 16) as usize % TLB_SIZE
    }

    /// Largest entry size currently present.
    pub fn max_entry_size(&self) -> i8 {
        self.max_entry_size
    }

    /// Returns the slot a size-masked virtual page hashes to.
    pub fn slot(&self, virt_page: u64) -> &TlbEntry {
        &self.entries[Self::hash(virt_page)]
    }

    /// Installs a walked translation, displacing whatever occupied its slot.
    pub fn insert(&mut self, entry: TlbEntry) {
        let idx = Self::hash(entry.virt_page);

        let old = &self.entries[idx];
        if old.permissions != 0 {
            self.size_count[old.size as usize] -= 1;
        }
        self.size_count[entry.size as usize] += 1;
        self.max_entry_size = 0;
        for (size, count) in self.size_count.iter().enumerate() {
            if *count > 0 {
                self.max_entry_size = size as i8;
            }
        }

        self.entries[idx] = entry;
    }
}
