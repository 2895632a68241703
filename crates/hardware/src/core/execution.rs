//! Fetch, decode dispatch, and the executor.
//!
//! The fetch stage reads one 32-bit unit (or consumes the buffered second
//! half of a compressed pair), classifies the encoding length, and leaves a
//! 32-bit instruction word for the executor — compressed encodings are
//! rewritten to their full-width equivalent first, so a single dispatch
//! covers both lengths. Any fault returns as a [`Trap`]; the cycle driver
//! hands it to the trap machine.

use std::sync::Arc;
use std::time::Duration;

use crate::common::{AccessType, MemFault, Trap};
use crate::core::Hart;
use crate::core::arch::csr::{MSTATUS_TSR, MSTATUS_TVM, MSTATUS_TW};
use crate::core::arch::mode::PrivilegeMode;
use crate::isa::decode::decode;
use crate::isa::privileged::opcodes as sys;
use crate::isa::rv64a::{funct3 as amo_width, funct5 as amo};
use crate::isa::rv64i::{funct3, funct7, opcodes};
use crate::isa::rv64m::funct3 as muldiv;
use crate::isa::rvc;
use crate::soc::{Machine, lock};

/// Sign-extends a loaded value of `width` bytes to 64 bits.
fn sign_extend_load(val: u64, width: usize) -> u64 {
    match width {
        1 => val as u8 as i8 as i64 as u64,
        2 => val as u16 as i16 as i64 as u64,
        4 => val as u32 as i32 as i64 as u64,
        _ => val,
    }
}

impl Hart {
    /// Fetches the next instruction into `inst`/`raw_inst`/`inst_len`.
    ///
    /// A pending `instbuf` (the compressed second half of a previously
    /// fetched 32-bit unit) is consumed instead of a memory access. For a
    /// fresh fetch of a compressed instruction whose neighbouring half is
    /// itself compressed, that half is buffered for the next cycle.
    pub(crate) fn fetch(&mut self) -> Result<(), Trap> {
        let word = if self.instbuf != 0 {
            let buffered = self.instbuf as u32;
            self.instbuf = 0;
            buffered
        } else {
            self.virt_fetch_u32(self.pc)
                .map_err(|fault| Trap::from_fault(fault, AccessType::Fetch, self.pc))?
        };
        self.raw_inst = word;

        // All-zero and all-one words are architecturally guaranteed illegal.
        if word == 0 || word == 0xFFFF_FFFF {
            self.inst_len = 0;
            return Err(Trap::IllegalInstruction(word));
        }

        if word & 0b11 != 0b11 {
            self.inst_len = 16;
            if word & 0x3_0000 != 0x3_0000 {
                self.instbuf = (word >> 16) as u16;
            }
            self.inst = word & 0xFFFF;
        } else if word & 0b11100 != 0b11100 {
            self.inst_len = 32;
            self.inst = word;
        } else {
            // 48-bit and longer encodings are not supported.
            self.inst_len = 0;
            return Err(Trap::InstructionAddressMisaligned(self.pc));
        }
        Ok(())
    }

    /// Executes the fetched instruction: updates registers, memory, and
    /// possibly the pc and privilege state.
    pub(crate) fn execute(&mut self) -> Result<(), Trap> {
        if self.inst_len == 16 {
            let expanded = rvc::expand(self.inst as u16);
            if expanded == 0 {
                return Err(Trap::IllegalInstruction(self.inst));
            }
            self.inst = expanded;
        }

        let d = decode(self.inst);
        let illegal = Trap::IllegalInstruction(self.inst);
        let step = self.inst_len as u64 / 8;
        let pc_before = self.pc;
        let mut pc_changed = false;

        match d.opcode {
            opcodes::OP_IMM => {
                let a = self.regs.read(d.rs1);
                let v = match d.funct3 {
                    funct3::ADD_SUB => a.wrapping_add(d.imm as u64),
                    funct3::SLT => ((a as i64) < d.imm) as u64,
                    funct3::SLTU => (a < d.imm as u64) as u64,
                    funct3::XOR => a ^ d.imm as u64,
                    funct3::OR => a | d.imm as u64,
                    funct3::AND => a & d.imm as u64,
                    funct3::SLL => a << ((d.imm & 0x3F) as u32),
                    _ => {
                        let sh = (d.imm & 0x3F) as u32;
                        if self.inst & funct7::ALT_BIT != 0 {
                            ((a as i64) >> sh) as u64
                        } else {
                            a >> sh
                        }
                    }
                };
                self.regs.write(d.rd, v);
            }

            opcodes::OP_IMM_32 => {
                let a = self.regs.read(d.rs1) as u32;
                let v: i64 = match d.funct3 {
                    funct3::ADD_SUB => (a as i32).wrapping_add(d.imm as i32) as i64,
                    funct3::SLL => ((a << ((d.imm & 0x1F) as u32)) as i32) as i64,
                    funct3::SRL_SRA => {
                        let sh = (d.imm & 0x1F) as u32;
                        if self.inst & funct7::ALT_BIT != 0 {
                            ((a as i32) >> sh) as i64
                        } else {
                            ((a >> sh) as i32) as i64
                        }
                    }
                    _ => return Err(illegal),
                };
                self.regs.write(d.rd, v as u64);
            }

            // The decoder delivers U-type immediates already shifted.
            opcodes::OP_LUI => self.regs.write(d.rd, d.imm as u64),
            opcodes::OP_AUIPC => self.regs.write(d.rd, self.pc.wrapping_add(d.imm as u64)),

            opcodes::OP_REG => {
                let a = self.regs.read(d.rs1);
                let b = self.regs.read(d.rs2);
                let v = match d.funct7 {
                    funct7::BASE | funct7::ALT => match d.funct3 {
                        funct3::ADD_SUB => {
                            if self.inst & funct7::ALT_BIT != 0 {
                                a.wrapping_sub(b)
                            } else {
                                a.wrapping_add(b)
                            }
                        }
                        funct3::SLT => ((a as i64) < (b as i64)) as u64,
                        funct3::SLTU => (a < b) as u64,
                        funct3::XOR => a ^ b,
                        funct3::OR => a | b,
                        funct3::AND => a & b,
                        funct3::SLL => a << ((b & 0x3F) as u32),
                        _ => {
                            let sh = (b & 0x3F) as u32;
                            if self.inst & funct7::ALT_BIT != 0 {
                                ((a as i64) >> sh) as u64
                            } else {
                                a >> sh
                            }
                        }
                    },
                    funct7::MULDIV => match d.funct3 {
                        muldiv::MUL => a.wrapping_mul(b),
                        muldiv::MULH => (((a as i64 as i128) * (b as i64 as i128)) >> 64) as u64,
                        muldiv::MULHSU => (((a as i64 as i128) * (b as i128)) >> 64) as u64,
                        muldiv::MULHU => (((a as u128) * (b as u128)) >> 64) as u64,
                        muldiv::DIV => {
                            let (ai, bi) = (a as i64, b as i64);
                            if bi == 0 {
                                u64::MAX
                            } else if ai == i64::MIN && bi == -1 {
                                ai as u64
                            } else {
                                ai.wrapping_div(bi) as u64
                            }
                        }
                        muldiv::DIVU => {
                            if b == 0 {
                                u64::MAX
                            } else {
                                a / b
                            }
                        }
                        muldiv::REM => {
                            let (ai, bi) = (a as i64, b as i64);
                            if bi == 0 {
                                a
                            } else if ai == i64::MIN && bi == -1 {
                                0
                            } else {
                                ai.wrapping_rem(bi) as u64
                            }
                        }
                        _ => {
                            if b == 0 {
                                a
                            } else {
                                a % b
                            }
                        }
                    },
                    _ => return Err(illegal),
                };
                self.regs.write(d.rd, v);
            }

            opcodes::OP_REG_32 => {
                let a = self.regs.read(d.rs1) as u32;
                let b = self.regs.read(d.rs2) as u32;
                let alt = self.inst & funct7::ALT_BIT != 0;
                let v: i64 = match d.funct7 {
                    funct7::BASE | funct7::ALT => match d.funct3 {
                        funct3::ADD_SUB => {
                            if alt {
                                (a as i32).wrapping_sub(b as i32) as i64
                            } else {
                                (a as i32).wrapping_add(b as i32) as i64
                            }
                        }
                        funct3::SLL => ((a << (b & 0x1F)) as i32) as i64,
                        funct3::SRL_SRA => {
                            if alt {
                                ((a as i32) >> (b & 0x1F)) as i64
                            } else {
                                ((a >> (b & 0x1F)) as i32) as i64
                            }
                        }
                        _ => return Err(illegal),
                    },
                    funct7::MULDIV => match d.funct3 {
                        muldiv::MUL => (a as i32).wrapping_mul(b as i32) as i64,
                        muldiv::DIV => {
                            let (ai, bi) = (a as i32, b as i32);
                            if bi == 0 {
                                -1
                            } else if ai == i32::MIN && bi == -1 {
                                ai as i64
                            } else {
                                ai.wrapping_div(bi) as i64
                            }
                        }
                        muldiv::DIVU => {
                            if b == 0 {
                                -1
                            } else {
                                ((a / b) as i32) as i64
                            }
                        }
                        muldiv::REM => {
                            let (ai, bi) = (a as i32, b as i32);
                            if bi == 0 {
                                ai as i64
                            } else if ai == i32::MIN && bi == -1 {
                                0
                            } else {
                                ai.wrapping_rem(bi) as i64
                            }
                        }
                        muldiv::REMU => {
                            if b == 0 {
                                (a as i32) as i64
                            } else {
                                ((a % b) as i32) as i64
                            }
                        }
                        _ => return Err(illegal),
                    },
                    _ => return Err(illegal),
                };
                self.regs.write(d.rd, v as u64);
            }

            opcodes::OP_JAL => {
                self.regs.write(d.rd, self.pc.wrapping_add(step));
                self.pc = self.pc.wrapping_add(d.imm as u64);
                pc_changed = true;
                if self.pc & 1 != 0 {
                    return Err(Trap::InstructionAddressMisaligned(self.pc));
                }
            }

            opcodes::OP_JALR => {
                // rd may alias rs1; read the base before linking.
                let link = self.pc.wrapping_add(step);
                self.pc = self.regs.read(d.rs1).wrapping_add(d.imm as u64) & !1;
                self.regs.write(d.rd, link);
                pc_changed = true;
            }

            opcodes::OP_BRANCH => {
                let a = self.regs.read(d.rs1);
                let b = self.regs.read(d.rs2);
                let taken = match d.funct3 {
                    funct3::BEQ => a == b,
                    funct3::BNE => a != b,
                    funct3::BLT => (a as i64) < (b as i64),
                    funct3::BGE => (a as i64) >= (b as i64),
                    funct3::BLTU => a < b,
                    funct3::BGEU => a >= b,
                    _ => return Err(illegal),
                };
                if taken {
                    self.pc = pc_before.wrapping_add(d.imm as u64);
                    pc_changed = true;
                    if self.pc & 1 != 0 {
                        return Err(Trap::InstructionAddressMisaligned(self.pc));
                    }
                }
            }

            opcodes::OP_LOAD => {
                let addr = self.regs.read(d.rs1).wrapping_add(d.imm as u64);
                let (width, signed) = match d.funct3 {
                    funct3::LB => (1, true),
                    funct3::LH => (2, true),
                    funct3::LW => (4, true),
                    funct3::LD => (8, true),
                    funct3::LBU => (1, false),
                    funct3::LHU => (2, false),
                    funct3::LWU => (4, false),
                    _ => return Err(illegal),
                };
                let raw = self
                    .virt_load(addr, width)
                    .map_err(|fault| Trap::from_fault(fault, AccessType::Read, addr))?;
                // rd is only written when the load succeeded.
                let v = if signed {
                    sign_extend_load(raw, width)
                } else {
                    raw
                };
                self.regs.write(d.rd, v);
            }

            opcodes::OP_STORE => {
                let addr = self.regs.read(d.rs1).wrapping_add(d.imm as u64);
                let width = match d.funct3 {
                    funct3::SB => 1,
                    funct3::SH => 2,
                    funct3::SW => 4,
                    funct3::SD => 8,
                    _ => return Err(illegal),
                };
                self.virt_store(addr, width, self.regs.read(d.rs2))
                    .map_err(|fault| Trap::from_fault(fault, AccessType::Write, addr))?;
            }

            opcodes::OP_MISC_MEM => {
                // Guest memory is synchronous; FENCE is a no-op.
                if d.funct3 == funct3::FENCE_I {
                    self.instbuf = 0;
                }
            }

            sys::OP_SYSTEM => self.system(&d, &mut pc_changed)?,

            opcodes::OP_AMO => self.atomic(&d)?,

            _ => {
                tracing::error!(
                    inst = format_args!("{:#010x}", self.inst),
                    pc = format_args!("{:#x}", self.pc),
                    "unknown major opcode"
                );
                return Err(illegal);
            }
        }

        if pc_changed {
            self.instbuf = 0;
        } else {
            self.pc = pc_before.wrapping_add(step);
        }
        self.csrs.minstret = self.csrs.minstret.wrapping_add(1);
        Ok(())
    }

    /// SYSTEM opcode: environment calls, trap returns, WFI, SFENCE.VMA,
    /// and CSR access.
    fn system(
        &mut self,
        d: &crate::isa::instruction::Decoded,
        pc_changed: &mut bool,
    ) -> Result<(), Trap> {
        let illegal = Trap::IllegalInstruction(self.inst);
        match self.inst {
            sys::ECALL => Err(match self.privmode {
                PrivilegeMode::User => Trap::EnvironmentCallFromUMode,
                PrivilegeMode::Supervisor => Trap::EnvironmentCallFromSMode,
                PrivilegeMode::Machine => Trap::EnvironmentCallFromMMode,
            }),
            sys::EBREAK => {
                if self.machine.config().signature_mode {
                    self.halted = true;
                    Ok(())
                } else {
                    Err(Trap::Breakpoint(self.pc))
                }
            }
            sys::MRET => {
                if self.privmode != PrivilegeMode::Machine {
                    return Err(illegal);
                }
                self.mret();
                *pc_changed = true;
                Ok(())
            }
            sys::SRET => {
                if self.privmode == PrivilegeMode::User
                    || self.csrs.mstatus & MSTATUS_TSR != 0
                {
                    return Err(illegal);
                }
                self.sret();
                *pc_changed = true;
                Ok(())
            }
            sys::WFI => {
                if self.csrs.mstatus & MSTATUS_TW != 0 {
                    return Err(illegal);
                }
                // Bounded nap; the next cycle re-evaluates pending
                // interrupts. Never blocks indefinitely.
                std::thread::sleep(Duration::from_micros(100));
                self.machine.lines.request_check(self.hartid);
                Ok(())
            }
            _ => {
                if d.funct3 == 0 && d.funct7 == sys::SFENCE_VMA_FUNCT7 {
                    if self.csrs.mstatus & MSTATUS_TVM != 0 {
                        return Err(illegal);
                    }
                    // Clearing the whole table over-approximates the
                    // ASID/address-filtered forms.
                    self.tlb.clear();
                    self.instbuf = 0;
                    Ok(())
                } else if d.funct3 == 0 || d.funct3 == 0b100 {
                    Err(illegal)
                } else {
                    self.csr_op(d)
                }
            }
        }
    }

    /// A-extension sequencer. The whole operation holds the global
    /// reservation lock, serialising LR/SC/AMO across harts.
    ///
    /// AMOs report store-class faults only, including for their load half.
    fn atomic(&mut self, d: &crate::isa::instruction::Decoded) -> Result<(), Trap> {
        let illegal = Trap::IllegalInstruction(self.inst);
        let is_w = match d.funct3 {
            amo_width::AMO_W => true,
            amo_width::AMO_D => false,
            _ => return Err(illegal),
        };
        let width = if is_w { 4 } else { 8 };
        let funct5 = d.funct7 >> 2;
        let addr = self.regs.read(d.rs1);
        let store_fault = |fault: MemFault| Trap::from_fault(fault, AccessType::Write, addr);

        let machine = Arc::clone(&self.machine);
        let mut res = lock(&machine.reservations);

        if funct5 == amo::SC {
            let phys = self
                .translate_data(addr, AccessType::Write)
                .map_err(store_fault)?;
            if res[self.hartid as usize] == phys {
                self.virt_store(addr, width, self.regs.read(d.rs2))
                    .map_err(store_fault)?;
                self.regs.write(d.rd, 0);
            } else {
                self.regs.write(d.rd, 1);
            }
            res[self.hartid as usize] = 0;
            return Ok(());
        }

        // rs2 is captured before the load lands in rd (rd may alias rs2).
        let src = if is_w {
            self.regs.read(d.rs2) as u32 as i32 as i64
        } else {
            self.regs.read(d.rs2) as i64
        };
        let usrc = if is_w {
            self.regs.read(d.rs2) as u32 as u64
        } else {
            self.regs.read(d.rs2)
        };

        let loaded = self.virt_load(addr, width).map_err(store_fault)?;
        let val = if is_w {
            sign_extend_load(loaded, 4)
        } else {
            loaded
        };
        self.regs.write(d.rd, val);

        if funct5 == amo::LR {
            let phys = self
                .translate_data(addr, AccessType::Read)
                .map_err(store_fault)?;
            Machine::take_reservation(&mut res, self.hartid, phys);
            return Ok(());
        }

        let old = val as i64;
        let uold = if is_w { val as u32 as u64 } else { val };
        let new: i64 = match funct5 {
            amo::AMOSWAP => src,
            amo::AMOADD => old.wrapping_add(src),
            amo::AMOXOR => old ^ src,
            amo::AMOAND => old & src,
            amo::AMOOR => old | src,
            amo::AMOMIN => old.min(src),
            amo::AMOMAX => old.max(src),
            amo::AMOMINU => uold.min(usrc) as i64,
            amo::AMOMAXU => uold.max(usrc) as i64,
            _ => return Err(illegal),
        };
        self.virt_store(addr, width, new as u64).map_err(store_fault)?;
        Ok(())
    }
}
