//! The hart: per-thread execution state and the cycle driver.
//!
//! A [`Hart`] owns everything private to one hardware thread — registers,
//! CSRs, TLB, PMP — plus a shared handle to the [`Machine`]. Each hart runs
//! its own driver thread; the only cross-thread state it touches is the
//! machine's RAM, devices, reservation table, and its own interrupt lines.

/// Architectural state (registers, modes, CSR storage).
pub mod arch;

/// CSR access semantics (privilege gating, mirrors, PMP registers).
pub mod csr;

/// Fetch, decode dispatch, and the executor.
pub mod execution;

/// The layered memory access path (physical, PMP-checked, virtual).
pub mod memory;

/// PMP, TLB, and the page-table walker.
pub mod mmu;

/// Trap construction, delegation, and interrupt evaluation.
pub mod trap;

use std::sync::Arc;

use crate::common::constants::{BOOT_ROM_BASE, DTB_BASE, SIGNATURE_HALT_WORD};
use crate::core::arch::csr::Csrs;
use crate::core::arch::gpr::RegisterFile;
use crate::core::arch::mode::PrivilegeMode;
use crate::core::mmu::pmp::Pmp;
use crate::core::mmu::tlb::Tlb;
use crate::isa::abi;
use crate::soc::Machine;

/// One hardware thread.
pub struct Hart {
    /// Immutable hart identity.
    pub hartid: u16,
    /// Integer registers; x0 reads as zero.
    pub regs: RegisterFile,
    /// Instruction pointer; bit 0 is clear after successful transfers.
    pub pc: u64,
    /// Current instruction word; compressed instructions are replaced by
    /// their 32-bit expansion before execution.
    pub inst: u32,
    /// The word as fetched, before masking/expansion (`mtval` payloads and
    /// the signature halt sentinel look at this).
    pub raw_inst: u32,
    /// Buffered second half of a 32-bit-aligned compressed pair; consumed
    /// in preference to a fetch, invalidated on any control transfer.
    pub instbuf: u16,
    /// Length in bits of the current instruction (16 or 32).
    pub inst_len: u8,
    /// Current privilege mode.
    pub privmode: PrivilegeMode,
    /// Control and status registers.
    pub csrs: Csrs,
    /// Physical memory protection engine.
    pub pmp: Pmp,
    /// Translation lookaside buffer.
    pub tlb: Tlb,
    /// Set when this hart has halted (signature sentinel / EBREAK in
    /// signature mode).
    pub(crate) halted: bool,
    /// The shared machine.
    pub machine: Arc<Machine>,
}

impl Hart {
    /// Creates a hart in its reset state.
    pub fn new(machine: Arc<Machine>, hartid: u16) -> Self {
        let mut hart = Self {
            hartid,
            regs: RegisterFile::new(),
            pc: 0,
            inst: 0,
            raw_inst: 0,
            instbuf: 0,
            inst_len: 0,
            privmode: PrivilegeMode::Machine,
            csrs: Csrs::default(),
            pmp: Pmp::new(),
            tlb: Tlb::new(),
            halted: false,
            machine,
        };
        hart.reset();
        hart
    }

    /// Resets the hart to the boot state.
    ///
    /// Machine mode at the boot ROM, stack pointer at the top of RAM,
    /// hart id in `a0` and the DTB address in `a1`; PMP entry 0 opens the
    /// whole physical space, `satp` is Bare.
    pub fn reset(&mut self) {
        self.regs = RegisterFile::new();
        self.pc = BOOT_ROM_BASE;
        self.inst = 0;
        self.raw_inst = 0;
        self.instbuf = 0;
        self.inst_len = 0;
        self.privmode = PrivilegeMode::Machine;
        self.csrs.reset(self.hartid);
        self.pmp.reset();
        self.tlb.clear();
        self.halted = false;

        self.regs.write(abi::REG_SP, self.machine.ram_end() - 1);
        // A return from the boot payload lands in empty RAM and stops on
        // the zero word there.
        self.regs.write(abi::REG_RA, 0x8100_0000);
        self.regs.write(abi::REG_A0, self.hartid as u64);
        self.regs.write(abi::REG_A1, DTB_BASE);

        let _ = self.machine.lines.swap_mip(self.hartid, 0);
    }

    /// Runs one cycle: exactly one instruction or one trap entry.
    ///
    /// Returns `false` when the hart has halted and its driver thread
    /// should exit.
    pub fn cycle(&mut self) -> bool {
        let fetched = self.fetch();

        if fetched.is_ok()
            && self.machine.config().signature_mode
            && self.inst_len == 32
            && self.raw_inst == SIGNATURE_HALT_WORD
        {
            return false;
        }

        if let Err(trap) = fetched.and_then(|()| self.execute()) {
            self.enter_trap(trap);
        }

        self.csrs.mcycle = self.csrs.mcycle.wrapping_add(1);
        self.csrs.cycle = self.csrs.mcycle;
        self.csrs.instret = self.csrs.minstret;

        if self.hartid == 0 {
            self.machine.clint.tick_slow();
        }

        if self.machine.lines.take_check(self.hartid) {
            self.service_interrupts();
        }

        !self.halted
    }

    /// Dumps pc and the register file to stdout.
    pub fn dump_state(&self) {
        println!(
            "hart {} pc {:#018x} inst {:#010x}",
            self.hartid, self.pc, self.inst
        );
        print!("{:?}", self.regs);
    }
}
