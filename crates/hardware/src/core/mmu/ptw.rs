//! Page-table walker for Sv39/Sv48/Sv57.
//!
//! Decodes `satp.MODE` into a level count (Bare translates identically),
//! descends the radix tree, honours superpage leaves with the required
//! alignment check, maintains accessed/dirty bits, and installs successful
//! translations into the TLB. PTE loads and write-backs go through the
//! PMP-checked layer; their faults surface as access faults of the
//! original intent.

use crate::common::constants::PAGE_SHIFT;
use crate::common::{AccessType, MemFault};
use crate::core::Hart;
use crate::core::arch::csr::{
    MSTATUS_MXR, MSTATUS_SUM, SATP_MODE_SHIFT, SATP_MODE_SV39, SATP_MODE_SV48, SATP_MODE_SV57,
    SATP_PPN_MASK,
};
use crate::core::arch::mode::PrivilegeMode;
use crate::core::mmu::tlb::TlbEntry;

/// PTE valid bit.
pub const PTE_V: u64 = 1 << 0;
/// PTE read permission bit.
pub const PTE_R: u64 = 1 << 1;
/// PTE write permission bit.
pub const PTE_W: u64 = 1 << 2;
/// PTE execute permission bit.
pub const PTE_X: u64 = 1 << 3;
/// PTE user-accessible bit.
pub const PTE_U: u64 = 1 << 4;
/// PTE accessed bit.
pub const PTE_A: u64 = 1 << 6;
/// PTE dirty bit.
pub const PTE_D: u64 = 1 << 7;

/// Shift of the PPN field inside a PTE.
const PTE_PPN_SHIFT: u64 = 10;

/// Extracts the physical page base address of a PTE.
fn pte_page_base(pte: u64) -> u64 {
    ((pte >> PTE_PPN_SHIFT) & SATP_PPN_MASK) << PAGE_SHIFT
}

/// Walks the page table for `va` and returns the physical address.
///
/// On success the translation is cached in the hart's TLB with its leaf
/// size, so subsequent accesses hit without a walk.
pub(crate) fn walk(hart: &mut Hart, va: u64, access: AccessType) -> Result<u64, MemFault> {
    let satp = hart.csrs.satp;
    let levels: i8 = match satp >> SATP_MODE_SHIFT {
        SATP_MODE_SV39 => 3,
        SATP_MODE_SV48 => 4,
        SATP_MODE_SV57 => 5,
        _ => 0,
    };
    if levels == 0 {
        return Ok(va);
    }

    let mut table = (satp & SATP_PPN_MASK) << PAGE_SHIFT;

    for level in (0..levels).rev() {
        let shift = PAGE_SHIFT + 9 * level as u64;
        let pte_addr = table + 8 * ((va >> shift) & 0x1FF);
        let pte = hart.mem_load(pte_addr, 8, AccessType::Read)?;

        if pte & PTE_V == 0 || (pte & (PTE_R | PTE_W)) == PTE_W {
            return Err(MemFault::Page);
        }
        if pte & (PTE_R | PTE_W | PTE_X) == 0 {
            // Pointer to the next level; a pointer at level 0 falls out of
            // the loop and faults.
            table = pte_page_base(pte);
            continue;
        }

        let mxr = hart.csrs.mstatus & MSTATUS_MXR != 0;
        let allowed = match access {
            AccessType::Write => pte & PTE_W != 0,
            AccessType::Fetch => pte & PTE_X != 0,
            AccessType::Read => pte & PTE_R != 0 || (mxr && pte & PTE_X != 0),
        };
        if !allowed {
            return Err(MemFault::Page);
        }

        if pte & PTE_U != 0 {
            if hart.privmode >= PrivilegeMode::Supervisor
                && (hart.csrs.mstatus & MSTATUS_SUM == 0 || access == AccessType::Fetch)
            {
                return Err(MemFault::Page);
            }
        } else if hart.privmode == PrivilegeMode::User {
            return Err(MemFault::Page);
        }

        let page_base = pte_page_base(pte);
        if level > 0 && page_base & ((1u64 << shift) - 1) != 0 {
            // Misaligned superpage: low PPN bits must be clear.
            return Err(MemFault::Page);
        }

        let mut new_pte = pte | PTE_A;
        if access == AccessType::Write {
            new_pte |= PTE_D;
        }
        if new_pte != pte {
            hart.mem_store(pte_addr, 8, new_pte)?;
        }

        let offset_mask = (1u64 << shift) - 1;
        hart.tlb.insert(TlbEntry {
            virt_page: va & !offset_mask,
            phy_page: page_base,
            pte_addr,
            size: level as u8,
            permissions: ((pte >> 1) & 0b111) as u8,
            user: pte & PTE_U != 0,
        });

        return Ok(page_base | (va & offset_mask));
    }

    Err(MemFault::Page)
}
