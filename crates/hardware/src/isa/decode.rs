//! 32-bit instruction decoder.
//!
//! Splits an instruction word into the R/I/S/B/U/J fields keyed on the major
//! opcode and produces a [`Decoded`] operand tuple with the immediate already
//! sign-extended. Compressed instructions must be expanded to their 32-bit
//! form (see [`crate::isa::rvc`]) before decoding.

use crate::isa::instruction::{Decoded, InstructionBits};
use crate::isa::privileged::opcodes as sys;
use crate::isa::rv64i::opcodes;

/// Width of a full instruction word in bits; used for sign extension.
const INSTRUCTION_WIDTH: u32 = 32;

/// Decodes a 32-bit instruction word into its component fields.
///
/// The immediate format is selected by the major opcode; opcodes without an
/// immediate (R-type, AMO) decode it as zero. SYSTEM instructions use the
/// I-type immediate, which doubles as the CSR address.
pub fn decode(inst: u32) -> Decoded {
    let opcode = inst.opcode();

    let imm = match opcode {
        opcodes::OP_LOAD | opcodes::OP_IMM | opcodes::OP_IMM_32 | opcodes::OP_JALR
        | sys::OP_SYSTEM => i_type_imm(inst),
        opcodes::OP_STORE => s_type_imm(inst),
        opcodes::OP_BRANCH => b_type_imm(inst),
        opcodes::OP_LUI | opcodes::OP_AUIPC => u_type_imm(inst),
        opcodes::OP_JAL => j_type_imm(inst),
        _ => 0,
    };

    Decoded {
        raw: inst,
        opcode,
        rd: inst.rd(),
        rs1: inst.rs1(),
        rs2: inst.rs2(),
        funct3: inst.funct3(),
        funct7: inst.funct7(),
        imm,
    }
}

/// I-type: `imm[11:0] | rs1 | funct3 | rd | opcode`.
fn i_type_imm(inst: u32) -> i64 {
    ((inst as i32) >> 20) as i64
}

/// S-type: `imm[11:5] | rs2 | rs1 | funct3 | imm[4:0] | opcode`.
fn s_type_imm(inst: u32) -> i64 {
    let low = (inst >> 7) & 0x1F;
    let high = (inst >> 25) & 0x7F;
    sign_extend((high << 5) | low, 12)
}

/// B-type: `imm[12] | imm[10:5] | rs2 | rs1 | funct3 | imm[4:1] | imm[11] | opcode`.
///
/// The immediate is an even branch offset; bit 0 is always zero.
fn b_type_imm(inst: u32) -> i64 {
    let bit_11 = (inst >> 7) & 1;
    let bits_4_1 = (inst >> 8) & 0xF;
    let bits_10_5 = (inst >> 25) & 0x3F;
    let bit_12 = (inst >> 31) & 1;

    sign_extend(
        (bit_12 << 12) | (bit_11 << 11) | (bits_10_5 << 5) | (bits_4_1 << 1),
        13,
    )
}

/// U-type: `imm[31:12] | rd | opcode`. Already shifted into place.
fn u_type_imm(inst: u32) -> i64 {
    ((inst & 0xFFFF_F000) as i32) as i64
}

/// J-type: `imm[20] | imm[10:1] | imm[11] | imm[19:12] | rd | opcode`.
fn j_type_imm(inst: u32) -> i64 {
    let bits_19_12 = (inst >> 12) & 0xFF;
    let bit_11 = (inst >> 20) & 1;
    let bits_10_1 = (inst >> 21) & 0x3FF;
    let bit_20 = (inst >> 31) & 1;

    sign_extend(
        (bit_20 << 20) | (bits_19_12 << 12) | (bit_11 << 11) | (bits_10_1 << 1),
        21,
    )
}

/// Sign-extends the low `bits` of `val` to 64 bits.
fn sign_extend(val: u32, bits: u32) -> i64 {
    let shift = INSTRUCTION_WIDTH - bits;
    (((val << shift) as i32) >> shift) as i64
}
