//! Compressed instruction expansion.
//!
//! [`expand`] converts a 16-bit compressed instruction into the 32-bit
//! encoding it is an alias for, including the high instruction bits the
//! executor inspects (bit 30 selecting SUB over ADD and arithmetic over
//! logical shifts). Returns 0 for reserved encodings and the floating-point
//! forms absent from RV64IMAC; 0 is a guaranteed-illegal word, so callers
//! turn it into an illegal-instruction trap carrying the original 16 bits.

use super::constants::{QUADRANT_0, QUADRANT_1, QUADRANT_2, q0, q1, q2};
use crate::isa::privileged::opcodes as sys;
use crate::isa::rv64i::{funct3, funct7, opcodes};

/// Stack pointer register index (x2).
const SP: u32 = 2;

/// Return address register index (x1).
const RA: u32 = 1;

/// Expands a 16-bit RVC instruction into its 32-bit equivalent.
pub fn expand(inst: u16) -> u32 {
    let op = inst & 0x3;
    let f3 = (inst >> 13) & 0x7;

    match op {
        QUADRANT_0 => expand_q0(inst, f3),
        QUADRANT_1 => expand_q1(inst, f3),
        QUADRANT_2 => expand_q2(inst, f3),
        _ => 0,
    }
}

/// The three-bit register fields of quadrant 0/1 memory and ALU forms map
/// onto x8-x15.
fn creg(field: u16) -> u32 {
    8 + (field as u32 & 0x7)
}

/// rd'/rs2' field at bits 4:2.
fn creg_low(inst: u16) -> u32 {
    creg(inst >> 2)
}

/// rs1'/rd' field at bits 9:7.
fn creg_high(inst: u16) -> u32 {
    creg(inst >> 7)
}

/// Full 5-bit register field at bits 11:7.
fn reg_high(inst: u16) -> u32 {
    (inst as u32 >> 7) & 0x1F
}

/// Full 5-bit register field at bits 6:2.
fn reg_low(inst: u16) -> u32 {
    (inst as u32 >> 2) & 0x1F
}

/// The 6-bit immediate of the CI format (bit 12, bits 6:2), sign-extended.
fn ci_imm(inst: u16) -> i64 {
    let raw = ((inst as u32 >> 2) & 0x1F) | ((inst as u32 >> 7) & 0x20);
    (((raw << 26) as i32) >> 26) as i64
}

/// Encodes an I-type instruction.
fn enc_i(imm: i64, rs1: u32, f3: u32, rd: u32, opcode: u32) -> u32 {
    ((imm as u32 & 0xFFF) << 20) | (rs1 << 15) | (f3 << 12) | (rd << 7) | opcode
}

/// Encodes an R-type instruction.
fn enc_r(f7: u32, rs2: u32, rs1: u32, f3: u32, rd: u32, opcode: u32) -> u32 {
    (f7 << 25) | (rs2 << 20) | (rs1 << 15) | (f3 << 12) | (rd << 7) | opcode
}

/// Encodes an S-type instruction.
fn enc_s(imm: u32, rs2: u32, rs1: u32, f3: u32, opcode: u32) -> u32 {
    ((imm >> 5) << 25) | (rs2 << 20) | (rs1 << 15) | (f3 << 12) | ((imm & 0x1F) << 7) | opcode
}

/// Encodes a B-type instruction from a byte offset.
fn enc_b(imm: i64, rs2: u32, rs1: u32, f3: u32, opcode: u32) -> u32 {
    let i = imm as u32;
    (((i >> 12) & 1) << 31)
        | (((i >> 5) & 0x3F) << 25)
        | (rs2 << 20)
        | (rs1 << 15)
        | (f3 << 12)
        | (((i >> 1) & 0xF) << 8)
        | (((i >> 11) & 1) << 7)
        | opcode
}

/// Encodes a J-type instruction from a byte offset.
fn enc_j(imm: i64, rd: u32, opcode: u32) -> u32 {
    let i = imm as u32;
    (((i >> 20) & 1) << 31)
        | (((i >> 1) & 0x3FF) << 21)
        | (((i >> 11) & 1) << 20)
        | (((i >> 12) & 0xFF) << 12)
        | (rd << 7)
        | opcode
}

fn expand_q0(inst: u16, f3: u16) -> u32 {
    match f3 {
        q0::C_ADDI4SPN => {
            let imm = (((inst >> 6) & 1) << 2
                | ((inst >> 5) & 1) << 3
                | ((inst >> 11) & 0x3) << 4
                | ((inst >> 7) & 0xF) << 6) as i64;
            if imm == 0 {
                // Covers the canonical all-zero illegal encoding too.
                return 0;
            }
            enc_i(imm, SP, funct3::ADD_SUB, creg_low(inst), opcodes::OP_IMM)
        }
        q0::C_LW => {
            let imm =
                (((inst >> 6) & 1) << 2 | ((inst >> 10) & 0x7) << 3 | ((inst >> 5) & 1) << 6)
                    as i64;
            enc_i(imm, creg_high(inst), funct3::LW, creg_low(inst), opcodes::OP_LOAD)
        }
        q0::C_LD => {
            let imm = (((inst >> 10) & 0x7) << 3 | ((inst >> 5) & 0x3) << 6) as i64;
            enc_i(imm, creg_high(inst), funct3::LD, creg_low(inst), opcodes::OP_LOAD)
        }
        q0::C_SW => {
            let imm =
                (((inst >> 6) & 1) << 2 | ((inst >> 10) & 0x7) << 3 | ((inst >> 5) & 1) << 6)
                    as u32;
            enc_s(imm, creg_low(inst), creg_high(inst), funct3::SW, opcodes::OP_STORE)
        }
        q0::C_SD => {
            let imm = (((inst >> 10) & 0x7) << 3 | ((inst >> 5) & 0x3) << 6) as u32;
            enc_s(imm, creg_low(inst), creg_high(inst), funct3::SD, opcodes::OP_STORE)
        }
        // C.FLD, C.FSD, and the reserved slot: no F/D support.
        _ => 0,
    }
}

fn expand_q1(inst: u16, f3: u16) -> u32 {
    match f3 {
        q1::C_ADDI => {
            let rd = reg_high(inst);
            enc_i(ci_imm(inst), rd, funct3::ADD_SUB, rd, opcodes::OP_IMM)
        }
        q1::C_ADDIW => {
            let rd = reg_high(inst);
            if rd == 0 {
                return 0;
            }
            enc_i(ci_imm(inst), rd, funct3::ADD_SUB, rd, opcodes::OP_IMM_32)
        }
        q1::C_LI => {
            enc_i(ci_imm(inst), 0, funct3::ADD_SUB, reg_high(inst), opcodes::OP_IMM)
        }
        q1::C_LUI_ADDI16SP => {
            let rd = reg_high(inst);
            if rd == SP {
                let raw = ((inst as u32 >> 6) & 1) << 4
                    | ((inst as u32 >> 2) & 1) << 5
                    | ((inst as u32 >> 5) & 1) << 6
                    | ((inst as u32 >> 3) & 3) << 7
                    | ((inst as u32 >> 12) & 1) << 9;
                let imm = (((raw << 22) as i32) >> 22) as i64;
                enc_i(imm, SP, funct3::ADD_SUB, SP, opcodes::OP_IMM)
            } else {
                let raw = ((inst as u32) << 5) & 0x2_0000 | ((inst as u32) << 10) & 0x1_F000;
                let imm = ((raw << 14) as i32) >> 14;
                (imm as u32 & 0xFFFF_F000) | (rd << 7) | opcodes::OP_LUI
            }
        }
        q1::C_MISC_ALU => expand_misc_alu(inst),
        q1::C_J => {
            let imm = c_j_imm(inst);
            enc_j(imm, 0, opcodes::OP_JAL)
        }
        q1::C_BEQZ | q1::C_BNEZ => {
            let raw = ((inst as u32 >> 4) & 0x100)
                | ((inst as u32) << 1) & 0xC0
                | ((inst as u32) << 3) & 0x20
                | ((inst as u32 >> 7) & 0x18)
                | ((inst as u32 >> 2) & 0x6);
            let imm = (((raw << 23) as i32) >> 23) as i64;
            let branch = if f3 == q1::C_BEQZ { funct3::BEQ } else { funct3::BNE };
            enc_b(imm, 0, creg_high(inst), branch, opcodes::OP_BRANCH)
        }
        _ => 0,
    }
}

/// C.SRLI/C.SRAI/C.ANDI and the register-register group.
fn expand_misc_alu(inst: u16) -> u32 {
    let rd = creg_high(inst);
    let rs2 = creg_low(inst);
    match (inst >> 10) & 0x3 {
        0b00 => {
            let shamt = ((inst as i64 >> 2) & 0x1F) | ((inst as i64 >> 7) & 0x20);
            enc_i(shamt, rd, funct3::SRL_SRA, rd, opcodes::OP_IMM)
        }
        0b01 => {
            let shamt = ((inst as i64 >> 2) & 0x1F) | ((inst as i64 >> 7) & 0x20);
            enc_i(shamt, rd, funct3::SRL_SRA, rd, opcodes::OP_IMM) | funct7::ALT_BIT
        }
        0b10 => enc_i(ci_imm(inst), rd, funct3::AND, rd, opcodes::OP_IMM),
        _ => {
            if inst & (1 << 12) != 0 {
                match (inst >> 5) & 0x3 {
                    0b00 => enc_r(funct7::ALT, rs2, rd, funct3::ADD_SUB, rd, opcodes::OP_REG_32),
                    0b01 => enc_r(funct7::BASE, rs2, rd, funct3::ADD_SUB, rd, opcodes::OP_REG_32),
                    _ => 0, // reserved
                }
            } else {
                let (f7, f3) = match (inst >> 5) & 0x3 {
                    0b00 => (funct7::ALT, funct3::ADD_SUB),
                    0b01 => (funct7::BASE, funct3::XOR),
                    0b10 => (funct7::BASE, funct3::OR),
                    _ => (funct7::BASE, funct3::AND),
                };
                enc_r(f7, rs2, rd, f3, rd, opcodes::OP_REG)
            }
        }
    }
}

/// Unscrambles the C.J 12-bit byte offset.
fn c_j_imm(inst: u16) -> i64 {
    let i = inst as u32;
    let raw = ((i >> 12) & 1) << 11
        | ((i >> 8) & 1) << 10
        | ((i >> 9) & 0x3) << 8
        | ((i >> 6) & 1) << 7
        | ((i >> 7) & 1) << 6
        | ((i >> 2) & 1) << 5
        | ((i >> 11) & 1) << 4
        | ((i >> 3) & 0x7) << 1;
    (((raw << 20) as i32) >> 20) as i64
}

fn expand_q2(inst: u16, f3: u16) -> u32 {
    match f3 {
        q2::C_SLLI => {
            let rd = reg_high(inst);
            let shamt = ((inst as i64 >> 2) & 0x1F) | ((inst as i64 >> 7) & 0x20);
            enc_i(shamt, rd, funct3::SLL, rd, opcodes::OP_IMM)
        }
        q2::C_LWSP => {
            let rd = reg_high(inst);
            if rd == 0 {
                return 0;
            }
            let imm = (((inst as i64) << 4) & 0xC0
                | ((inst as i64) >> 7) & 0x20
                | ((inst as i64) >> 2) & 0x1C) as i64;
            enc_i(imm, SP, funct3::LW, rd, opcodes::OP_LOAD)
        }
        q2::C_LDSP => {
            let rd = reg_high(inst);
            if rd == 0 {
                return 0;
            }
            let imm = (((inst as i64) << 4) & 0x1C0
                | ((inst as i64) >> 7) & 0x20
                | ((inst as i64) >> 2) & 0x18) as i64;
            enc_i(imm, SP, funct3::LD, rd, opcodes::OP_LOAD)
        }
        q2::C_JR_MV_ADD => {
            let rs1 = reg_high(inst);
            let rs2 = reg_low(inst);
            if inst & (1 << 12) != 0 {
                if rs2 == 0 {
                    if rs1 == 0 {
                        sys::EBREAK
                    } else {
                        enc_i(0, rs1, 0, RA, opcodes::OP_JALR)
                    }
                } else {
                    enc_r(funct7::BASE, rs2, rs1, funct3::ADD_SUB, rs1, opcodes::OP_REG)
                }
            } else if rs2 == 0 {
                if rs1 == 0 {
                    return 0; // reserved
                }
                enc_i(0, rs1, 0, 0, opcodes::OP_JALR)
            } else {
                enc_r(funct7::BASE, rs2, 0, funct3::ADD_SUB, rs1, opcodes::OP_REG)
            }
        }
        q2::C_SWSP => {
            let imm = (((inst >> 1) & 0xC0) | ((inst >> 7) & 0x3C)) as u32;
            enc_s(imm, reg_low(inst), SP, funct3::SW, opcodes::OP_STORE)
        }
        q2::C_SDSP => {
            let imm = (((inst >> 1) & 0x1C0) | ((inst >> 7) & 0x38)) as u32;
            enc_s(imm, reg_low(inst), SP, funct3::SD, opcodes::OP_STORE)
        }
        // C.FLDSP / C.FSDSP: no D support.
        _ => 0,
    }
}
