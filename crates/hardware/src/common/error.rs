//! Guest-visible trap definitions.
//!
//! This module defines the trap currency of the emulator:
//! 1. **Trap Representation:** All synchronous exceptions and asynchronous
//!    interrupts the machine can deliver.
//! 2. **Cause Encoding:** Conversion to the `mcause`/`scause` encoding
//!    (interrupt bit in the MSB, cause code in the low bits).
//! 3. **Trap Values:** The `mtval`/`stval` payload carried by each trap.

use std::fmt;

use super::constants::CAUSE_INTERRUPT_BIT;
use super::data::{AccessType, MemFault};

/// RISC-V trap types representing exceptions and interrupts.
///
/// Traps transfer control to a handler selected by the delegation registers.
/// The payload is what lands in `mtval`/`stval` (faulting address for memory
/// traps, the encoding for illegal instructions, zero otherwise).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trap {
    /// Control transferred to an address with bit 0 set, or an unsupported
    /// instruction length was fetched. Payload: the target address.
    InstructionAddressMisaligned(u64),
    /// Instruction fetch violated PMP or hit an unmapped region.
    InstructionAccessFault(u64),
    /// Invalid or unimplemented encoding. Payload: the instruction word.
    IllegalInstruction(u32),
    /// `EBREAK`. Payload: the program counter.
    Breakpoint(u64),
    /// Load violated PMP or hit an unmapped region.
    LoadAccessFault(u64),
    /// Store or AMO violated PMP or hit an unmapped region.
    StoreAccessFault(u64),
    /// `ECALL` from user mode.
    EnvironmentCallFromUMode,
    /// `ECALL` from supervisor mode.
    EnvironmentCallFromSMode,
    /// `ECALL` from machine mode.
    EnvironmentCallFromMMode,
    /// Instruction fetch failed address translation.
    InstructionPageFault(u64),
    /// Load failed address translation.
    LoadPageFault(u64),
    /// Store or AMO failed address translation.
    StorePageFault(u64),

    /// Supervisor software interrupt.
    SupervisorSoftwareInterrupt,
    /// Machine software interrupt.
    MachineSoftwareInterrupt,
    /// Supervisor timer interrupt.
    SupervisorTimerInterrupt,
    /// Machine timer interrupt.
    MachineTimerInterrupt,
    /// Supervisor external interrupt.
    SupervisorExternalInterrupt,
    /// Machine external interrupt.
    MachineExternalInterrupt,
}

/// Exception cause codes (`mcause` with the interrupt bit clear).
pub mod exception {
    /// Instruction address misaligned (0).
    pub const INSTRUCTION_ADDRESS_MISALIGNED: u64 = 0;
    /// Instruction access fault (1).
    pub const INSTRUCTION_ACCESS_FAULT: u64 = 1;
    /// Illegal instruction (2).
    pub const ILLEGAL_INSTRUCTION: u64 = 2;
    /// Breakpoint (3).
    pub const BREAKPOINT: u64 = 3;
    /// Load access fault (5).
    pub const LOAD_ACCESS_FAULT: u64 = 5;
    /// Store/AMO access fault (7).
    pub const STORE_ACCESS_FAULT: u64 = 7;
    /// Environment call from U-mode (8).
    pub const ENVIRONMENT_CALL_FROM_U_MODE: u64 = 8;
    /// Environment call from S-mode (9).
    pub const ENVIRONMENT_CALL_FROM_S_MODE: u64 = 9;
    /// Environment call from M-mode (11).
    pub const ENVIRONMENT_CALL_FROM_M_MODE: u64 = 11;
    /// Instruction page fault (12).
    pub const INSTRUCTION_PAGE_FAULT: u64 = 12;
    /// Load page fault (13).
    pub const LOAD_PAGE_FAULT: u64 = 13;
    /// Store/AMO page fault (15).
    pub const STORE_PAGE_FAULT: u64 = 15;
}

/// Interrupt cause codes (`mcause` low bits, interrupt bit set separately).
pub mod interrupt {
    /// Supervisor software interrupt (1).
    pub const SUPERVISOR_SOFTWARE: u64 = 1;
    /// Machine software interrupt (3).
    pub const MACHINE_SOFTWARE: u64 = 3;
    /// Supervisor timer interrupt (5).
    pub const SUPERVISOR_TIMER: u64 = 5;
    /// Machine timer interrupt (7).
    pub const MACHINE_TIMER: u64 = 7;
    /// Supervisor external interrupt (9).
    pub const SUPERVISOR_EXTERNAL: u64 = 9;
    /// Machine external interrupt (11).
    pub const MACHINE_EXTERNAL: u64 = 11;
}

impl Trap {
    /// Returns `(is_interrupt, cause_code)` for this trap.
    pub fn cause(self) -> (bool, u64) {
        use exception as e;
        use interrupt as i;
        match self {
            Trap::InstructionAddressMisaligned(_) => (false, e::INSTRUCTION_ADDRESS_MISALIGNED),
            Trap::InstructionAccessFault(_) => (false, e::INSTRUCTION_ACCESS_FAULT),
            Trap::IllegalInstruction(_) => (false, e::ILLEGAL_INSTRUCTION),
            Trap::Breakpoint(_) => (false, e::BREAKPOINT),
            Trap::LoadAccessFault(_) => (false, e::LOAD_ACCESS_FAULT),
            Trap::StoreAccessFault(_) => (false, e::STORE_ACCESS_FAULT),
            Trap::EnvironmentCallFromUMode => (false, e::ENVIRONMENT_CALL_FROM_U_MODE),
            Trap::EnvironmentCallFromSMode => (false, e::ENVIRONMENT_CALL_FROM_S_MODE),
            Trap::EnvironmentCallFromMMode => (false, e::ENVIRONMENT_CALL_FROM_M_MODE),
            Trap::InstructionPageFault(_) => (false, e::INSTRUCTION_PAGE_FAULT),
            Trap::LoadPageFault(_) => (false, e::LOAD_PAGE_FAULT),
            Trap::StorePageFault(_) => (false, e::STORE_PAGE_FAULT),
            Trap::SupervisorSoftwareInterrupt => (true, i::SUPERVISOR_SOFTWARE),
            Trap::MachineSoftwareInterrupt => (true, i::MACHINE_SOFTWARE),
            Trap::SupervisorTimerInterrupt => (true, i::SUPERVISOR_TIMER),
            Trap::MachineTimerInterrupt => (true, i::MACHINE_TIMER),
            Trap::SupervisorExternalInterrupt => (true, i::SUPERVISOR_EXTERNAL),
            Trap::MachineExternalInterrupt => (true, i::MACHINE_EXTERNAL),
        }
    }

    /// Returns the `mcause`/`scause` encoding of this trap.
    pub fn mcause(self) -> u64 {
        let (interrupt, code) = self.cause();
        if interrupt {
            CAUSE_INTERRUPT_BIT | code
        } else {
            code
        }
    }

    /// Returns the `mtval`/`stval` payload of this trap.
    pub fn tval(self) -> u64 {
        match self {
            Trap::InstructionAddressMisaligned(a)
            | Trap::InstructionAccessFault(a)
            | Trap::Breakpoint(a)
            | Trap::LoadAccessFault(a)
            | Trap::StoreAccessFault(a)
            | Trap::InstructionPageFault(a)
            | Trap::LoadPageFault(a)
            | Trap::StorePageFault(a) => a,
            Trap::IllegalInstruction(i) => i as u64,
            _ => 0,
        }
    }

    /// Builds the trap for a failed memory access of the given intent.
    pub fn from_fault(fault: MemFault, access: AccessType, addr: u64) -> Self {
        match (fault, access) {
            (MemFault::Access, AccessType::Fetch) => Trap::InstructionAccessFault(addr),
            (MemFault::Access, AccessType::Read) => Trap::LoadAccessFault(addr),
            (MemFault::Access, AccessType::Write) => Trap::StoreAccessFault(addr),
            (MemFault::Page, AccessType::Fetch) => Trap::InstructionPageFault(addr),
            (MemFault::Page, AccessType::Read) => Trap::LoadPageFault(addr),
            (MemFault::Page, AccessType::Write) => Trap::StorePageFault(addr),
        }
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::InstructionAddressMisaligned(addr) => {
                write!(f, "InstructionAddressMisaligned({:#x})", addr)
            }
            Trap::InstructionAccessFault(addr) => write!(f, "InstructionAccessFault({:#x})", addr),
            Trap::IllegalInstruction(inst) => write!(f, "IllegalInstruction({:#x})", inst),
            Trap::Breakpoint(pc) => write!(f, "Breakpoint({:#x})", pc),
            Trap::LoadAccessFault(addr) => write!(f, "LoadAccessFault({:#x})", addr),
            Trap::StoreAccessFault(addr) => write!(f, "StoreAccessFault({:#x})", addr),
            Trap::EnvironmentCallFromUMode => write!(f, "EnvironmentCallFromUMode"),
            Trap::EnvironmentCallFromSMode => write!(f, "EnvironmentCallFromSMode"),
            Trap::EnvironmentCallFromMMode => write!(f, "EnvironmentCallFromMMode"),
            Trap::InstructionPageFault(addr) => write!(f, "InstructionPageFault({:#x})", addr),
            Trap::LoadPageFault(addr) => write!(f, "LoadPageFault({:#x})", addr),
            Trap::StorePageFault(addr) => write!(f, "StorePageFault({:#x})", addr),
            Trap::SupervisorSoftwareInterrupt => write!(f, "SupervisorSoftwareInterrupt"),
            Trap::MachineSoftwareInterrupt => write!(f, "MachineSoftwareInterrupt"),
            Trap::SupervisorTimerInterrupt => write!(f, "SupervisorTimerInterrupt"),
            Trap::MachineTimerInterrupt => write!(f, "MachineTimerInterrupt"),
            Trap::SupervisorExternalInterrupt => write!(f, "SupervisorExternalInterrupt"),
            Trap::MachineExternalInterrupt => write!(f, "MachineExternalInterrupt"),
        }
    }
}

impl std::error::Error for Trap {}
