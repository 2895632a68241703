//! The layered memory access path.
//!
//! Three layers compose every guest access:
//! 1. **Physical** — bus dispatch only ([`Machine::phys_load`] and friends).
//! 2. **PMP-checked** — [`Hart::mem_load`]/[`Hart::mem_store`] apply the
//!    expanded-PMP range check over the whole access before touching the
//!    bus.
//! 3. **Virtual** — [`Hart::virt_load`]/[`Hart::virt_store`]/
//!    [`Hart::virt_fetch_u32`] run TLB → walker → PMP-checked physical
//!    below machine mode, and honour `mstatus.MPRV` for data accesses in
//!    machine mode.
//!
//! A TLB hit must refresh the accessed/dirty bits of the backing PTE; if
//! that PTE write itself faults on PMP, the hit is demoted to a miss and
//! the walker decides.

use crate::common::constants::PAGE_SHIFT;
use crate::common::{AccessType, MemFault};
use crate::core::Hart;
use crate::core::arch::csr::{
    MSTATUS_MPP, MSTATUS_MPP_SHIFT, MSTATUS_MPRV, MSTATUS_MXR, MSTATUS_SUM,
};
use crate::core::arch::mode::PrivilegeMode;
use crate::core::mmu::ptw;
use crate::core::mmu::ptw::{PTE_A, PTE_D};
use crate::core::mmu::tlb::{TLB_PERM_R, TLB_PERM_W, TLB_PERM_X};
use crate::core::mmu::pmp::{PMP_R, PMP_W, PMP_X, PmpRange};

impl Hart {
    /// PMP check for an access of `width` bytes at `addr`.
    fn pmp_check(&self, addr: u64, width: usize, access: AccessType) -> Result<(), MemFault> {
        let result = if width == 1 {
            match self.pmp.check(addr, self.privmode) {
                Some(lxwr) => PmpRange::Perms(lxwr),
                None => PmpRange::NoMatch,
            }
        } else {
            self.pmp
                .check_range(addr, addr.saturating_add(width as u64 - 1), self.privmode)
        };

        match result {
            PmpRange::Perms(lxwr) => {
                let needed = match access {
                    AccessType::Fetch => PMP_X,
                    AccessType::Read => PMP_R,
                    AccessType::Write => PMP_W,
                };
                if lxwr & needed == 0 {
                    Err(MemFault::Access)
                } else {
                    Ok(())
                }
            }
            PmpRange::Boundary => Err(MemFault::Access),
            PmpRange::NoMatch => {
                if self.privmode < PrivilegeMode::Machine {
                    Err(MemFault::Access)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// PMP-checked physical load.
    pub fn mem_load(
        &mut self,
        addr: u64,
        width: usize,
        access: AccessType,
    ) -> Result<u64, MemFault> {
        self.pmp_check(addr, width, access)?;
        self.machine.phys_load(addr, width)
    }

    /// PMP-checked physical store.
    pub fn mem_store(&mut self, addr: u64, width: usize, val: u64) -> Result<(), MemFault> {
        self.pmp_check(addr, width, AccessType::Write)?;
        self.machine.phys_store(addr, width, val)
    }

    /// Runs `f` at the effective data privilege: machine mode with
    /// `mstatus.MPRV` set and `MPP != M` is lowered to MPP for the duration
    /// (restored on every path, faults included). Instruction fetches never
    /// go through here.
    fn with_data_privilege<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.privmode;
        if saved == PrivilegeMode::Machine && self.csrs.mstatus & MSTATUS_MPRV != 0 {
            let mpp =
                PrivilegeMode::from_bits((self.csrs.mstatus & MSTATUS_MPP) >> MSTATUS_MPP_SHIFT);
            if mpp != PrivilegeMode::Machine {
                self.privmode = mpp;
            }
        }
        let out = f(self);
        self.privmode = saved;
        out
    }

    /// Translates a virtual address at the current privilege.
    ///
    /// Machine mode skips translation entirely; otherwise the TLB is
    /// probed and a full walk resolves misses.
    pub fn translate(&mut self, va: u64, access: AccessType) -> Result<u64, MemFault> {
        if self.privmode == PrivilegeMode::Machine {
            return Ok(va);
        }
        if let Some(pa) = self.tlb_lookup(va, access) {
            return Ok(pa);
        }
        ptw::walk(self, va, access)
    }

    /// Translates a data address honouring MPRV (used by the atomic
    /// sequencer to obtain reservation addresses).
    pub(crate) fn translate_data(&mut self, va: u64, access: AccessType) -> Result<u64, MemFault> {
        self.with_data_privilege(|hart| hart.translate(va, access))
    }

    /// Virtual load of `width` bytes.
    pub fn virt_load(&mut self, va: u64, width: usize) -> Result<u64, MemFault> {
        self.with_data_privilege(|hart| {
            let pa = hart.translate(va, AccessType::Read)?;
            hart.mem_load(pa, width, AccessType::Read)
        })
    }

    /// Virtual store of the low `width` bytes of `val`.
    pub fn virt_store(&mut self, va: u64, width: usize, val: u64) -> Result<(), MemFault> {
        self.with_data_privilege(|hart| {
            let pa = hart.translate(va, AccessType::Write)?;
            hart.mem_store(pa, width, val)
        })
    }

    /// Virtual instruction fetch of one 32-bit unit at `va`.
    pub(crate) fn virt_fetch_u32(&mut self, va: u64) -> Result<u32, MemFault> {
        let pa = self.translate(va, AccessType::Fetch)?;
        Ok(self.mem_load(pa, 4, AccessType::Fetch)? as u32)
    }

    /// TLB probe for `va`. `None` is a miss; permission violations and
    /// inaccessible cached PTEs also read as misses so the walker delivers
    /// the authoritative answer.
    fn tlb_lookup(&mut self, va: u64, access: AccessType) -> Option<u64> {
        if self.csrs.satp == 0 {
            return Some(va);
        }
        let mxr = self.csrs.mstatus & MSTATUS_MXR != 0;
        let sum = self.csrs.mstatus & MSTATUS_SUM != 0;
        let needed = match access {
            AccessType::Fetch => TLB_PERM_X,
            AccessType::Write => TLB_PERM_W,
            AccessType::Read => TLB_PERM_R | if mxr { TLB_PERM_X } else { 0 },
        };

        for size in (0..=self.tlb.max_entry_size()).rev() {
            let shift = PAGE_SHIFT + 9 * size as u64;
            let entry = *self.tlb.slot(va & (u64::MAX << shift));
            if entry.size as i8 != size || entry.permissions == 0 {
                continue;
            }
            if (va ^ entry.virt_page) >= (1u64 << shift) {
                continue;
            }
            if needed & entry.permissions == 0 {
                continue;
            }
            if self.privmode == PrivilegeMode::User && !entry.user {
                continue;
            }
            if self.privmode >= PrivilegeMode::Supervisor
                && entry.user
                && (access == AccessType::Fetch || !sum)
            {
                continue;
            }

            let Ok(pte) = self.mem_load(entry.pte_addr, 8, AccessType::Read) else {
                return None;
            };
            let mut new_pte = pte | PTE_A;
            if access == AccessType::Write {
                new_pte |= PTE_D;
            }
            if new_pte != pte && self.mem_store(entry.pte_addr, 8, new_pte).is_err() {
                return None;
            }

            return Some(entry.phy_page + (va & (u64::MAX >> (64 - shift))));
        }
        None
    }
}
