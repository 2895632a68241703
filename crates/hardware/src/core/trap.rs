//! Trap construction, delegation, and interrupt evaluation.
//!
//! [`Hart::raise`] is the single entry point for delivering a trap: it
//! applies the interrupt masking rules, decides between machine mode and a
//! supervisor delegation, saves the context CSRs, and redirects the pc to
//! the selected vector. Masked interrupts silently vanish; synchronous
//! exceptions are never masked.

use crate::common::Trap;
use crate::core::Hart;
use crate::core::arch::csr::{
    INT_MEIP, INT_MSIP, INT_MTIP, INT_SEIP, INT_SSIP, INT_STIP, MSTATUS_MIE, MSTATUS_MPIE,
    MSTATUS_MPP, MSTATUS_MPP_SHIFT, MSTATUS_MPRV, MSTATUS_SIE, MSTATUS_SPIE, MSTATUS_SPP,
};
use crate::core::arch::mode::PrivilegeMode;

impl Hart {
    /// Delivers a trap, returning `None` if it was a masked interrupt.
    ///
    /// Interrupts are suppressed when the global enable of the current mode
    /// is clear (`mstatus.MIE` in M-mode; `mstatus.SIE` in S-mode for
    /// causes S-mode may mask) or when the per-cause enable bit in
    /// `mie`/`sie` is clear for the selected target.
    pub fn raise(&mut self, trap: Trap) -> Option<Trap> {
        let (interrupt, cause) = trap.cause();
        let bit = 1u64 << cause;

        if interrupt {
            let mstatus = self.csrs.mstatus;
            if self.privmode == PrivilegeMode::Machine && mstatus & MSTATUS_MIE == 0 {
                return None;
            }
            // M-mode interrupt causes cannot be masked from S-mode.
            if self.privmode == PrivilegeMode::Supervisor
                && mstatus & MSTATUS_SIE == 0
                && !matches!(cause, 3 | 7 | 11)
            {
                return None;
            }
        }

        let deleg = if interrupt {
            self.csrs.mideleg
        } else {
            self.csrs.medeleg
        };
        let delegate = deleg & bit != 0 && self.privmode <= PrivilegeMode::Supervisor;

        if delegate {
            if interrupt && self.csrs.sie & bit == 0 {
                return None;
            }

            let mut mstatus = self.csrs.mstatus;
            mstatus = if self.privmode == PrivilegeMode::Supervisor {
                mstatus | MSTATUS_SPP
            } else {
                mstatus & !MSTATUS_SPP
            };
            mstatus = if mstatus & MSTATUS_SIE != 0 {
                mstatus | MSTATUS_SPIE
            } else {
                mstatus & !MSTATUS_SPIE
            };
            mstatus &= !MSTATUS_SIE;
            self.csrs.set_mstatus(mstatus);
            self.privmode = PrivilegeMode::Supervisor;

            self.csrs.scause = trap.mcause();
            self.csrs.sepc = self.pc;
            self.csrs.stval = trap.tval();

            self.pc = self.csrs.stvec & !0b11;
            if self.csrs.stvec & 0b11 == 1 {
                self.pc += 4 * cause;
            }
        } else {
            if interrupt && self.csrs.mie & bit == 0 {
                return None;
            }

            let mut mstatus = self.csrs.mstatus;
            mstatus = (mstatus & !MSTATUS_MPP) | (self.privmode.bits() << MSTATUS_MPP_SHIFT);
            mstatus = if mstatus & MSTATUS_MIE != 0 {
                mstatus | MSTATUS_MPIE
            } else {
                mstatus & !MSTATUS_MPIE
            };
            mstatus &= !MSTATUS_MIE;
            self.csrs.set_mstatus(mstatus);
            self.privmode = PrivilegeMode::Machine;

            self.csrs.mcause = trap.mcause();
            self.csrs.mepc = self.pc;
            self.csrs.mtval = trap.tval();

            self.pc = self.csrs.mtvec & !0b11;
            if self.csrs.mtvec & 0b11 == 1 {
                self.pc += 4 * cause;
            }
        }

        // The handler must not execute a stale buffered half-pair.
        self.instbuf = 0;
        Some(trap)
    }

    /// Delivers a synchronous exception (never masked).
    pub(crate) fn enter_trap(&mut self, trap: Trap) {
        tracing::debug!(hart = self.hartid, %trap, pc = format_args!("{:#x}", self.pc), "trap");
        let _ = self.raise(trap);
    }

    /// Scans `mip` and fires the first deliverable pending interrupt.
    ///
    /// Machine-level causes are considered first (external, software,
    /// timer), then the supervisor causes; a second pass covers supervisor
    /// causes that only `mstatus.SIE` gates.
    pub(crate) fn service_interrupts(&mut self) {
        let mip = self.machine.lines.mip(self.hartid);
        if mip == 0 {
            return;
        }

        if self.csrs.mstatus & MSTATUS_MIE != 0 || self.privmode < PrivilegeMode::Machine {
            let order = [
                (INT_MEIP, Trap::MachineExternalInterrupt),
                (INT_MSIP, Trap::MachineSoftwareInterrupt),
                (INT_MTIP, Trap::MachineTimerInterrupt),
                (INT_SEIP, Trap::SupervisorExternalInterrupt),
                (INT_SSIP, Trap::SupervisorSoftwareInterrupt),
                (INT_STIP, Trap::SupervisorTimerInterrupt),
            ];
            for (bit, trap) in order {
                if mip & bit != 0 && self.raise(trap).is_some() {
                    return;
                }
            }
        }

        if self.csrs.mstatus & MSTATUS_SIE != 0 {
            let order = [
                (INT_SEIP, Trap::SupervisorExternalInterrupt),
                (INT_SSIP, Trap::SupervisorSoftwareInterrupt),
                (INT_STIP, Trap::SupervisorTimerInterrupt),
            ];
            for (bit, trap) in order {
                if mip & bit != 0 && self.raise(trap).is_some() {
                    return;
                }
            }
        }
    }

    /// MRET: return from a machine-mode trap handler.
    pub(crate) fn mret(&mut self) {
        let mstatus = self.csrs.mstatus;
        let mut st = if mstatus & MSTATUS_MPIE != 0 {
            mstatus | MSTATUS_MIE
        } else {
            mstatus & !MSTATUS_MIE
        };
        st |= MSTATUS_MPIE;

        self.pc = self.csrs.mepc & !1;
        self.privmode = PrivilegeMode::from_bits((st & MSTATUS_MPP) >> MSTATUS_MPP_SHIFT);
        st &= !MSTATUS_MPP;
        if self.privmode != PrivilegeMode::Machine {
            st &= !MSTATUS_MPRV;
        }
        self.csrs.set_mstatus(st);
        self.machine.lines.request_check(self.hartid);
    }

    /// SRET: return from a supervisor-mode trap handler.
    pub(crate) fn sret(&mut self) {
        let mstatus = self.csrs.mstatus;
        let mut st = if mstatus & MSTATUS_SPIE != 0 {
            mstatus | MSTATUS_SIE
        } else {
            mstatus & !MSTATUS_SIE
        };
        st |= MSTATUS_SPIE;

        self.pc = self.csrs.sepc & !1;
        self.privmode = if st & MSTATUS_SPP != 0 {
            PrivilegeMode::Supervisor
        } else {
            PrivilegeMode::User
        };
        st &= !MSTATUS_SPP;
        if self.privmode != PrivilegeMode::Machine {
            st &= !MSTATUS_MPRV;
        }
        self.csrs.set_mstatus(st);
        self.machine.lines.request_check(self.hartid);
    }
}
