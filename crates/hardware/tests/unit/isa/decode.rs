//! Decoder tests: field extraction and immediate reconstruction for every
//! instruction format.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::{b_type, i_type, j_type, s_type};
use rvhart_core::isa::decode::decode;
use rvhart_core::isa::rv64i::opcodes;

#[test]
fn addi_fields() {
    // addi x5, x0, 1
    let d = decode(0x0010_0293);
    assert_eq!(d.opcode, opcodes::OP_IMM);
    assert_eq!(d.rd, 5);
    assert_eq!(d.rs1, 0);
    assert_eq!(d.funct3, 0);
    assert_eq!(d.imm, 1);
}

#[test]
fn i_type_immediate_is_sign_extended() {
    // addi x1, x1, -1
    let d = decode(i_type(-1, 1, 0, 1, opcodes::OP_IMM));
    assert_eq!(d.imm, -1);

    // lowest immediate
    let d = decode(i_type(-2048, 1, 0, 1, opcodes::OP_IMM));
    assert_eq!(d.imm, -2048);
}

#[test]
fn s_type_immediate_reassembles() {
    let d = decode(s_type(-8, 3, 2, 0b011, opcodes::OP_STORE));
    assert_eq!(d.opcode, opcodes::OP_STORE);
    assert_eq!(d.rs1, 2);
    assert_eq!(d.rs2, 3);
    assert_eq!(d.imm, -8);
}

#[test]
fn b_type_immediate_is_even_and_signed() {
    let d = decode(b_type(-16, 1, 2, 0b000, opcodes::OP_BRANCH));
    assert_eq!(d.imm, -16);

    let d = decode(b_type(4094, 1, 2, 0b000, opcodes::OP_BRANCH));
    assert_eq!(d.imm, 4094);
}

#[test]
fn u_type_immediate_comes_shifted() {
    // lui x7, 0xFFFFF
    let d = decode(0xFFFF_F3B7);
    assert_eq!(d.rd, 7);
    assert_eq!(d.imm, (0xFFFF_F000u32 as i32) as i64);
}

#[test]
fn j_type_immediate_reassembles() {
    let d = decode(j_type(-4096, 1, opcodes::OP_JAL));
    assert_eq!(d.rd, 1);
    assert_eq!(d.imm, -4096);

    let d = decode(j_type(2, 0, opcodes::OP_JAL));
    assert_eq!(d.imm, 2);
}

proptest! {
    #[test]
    fn i_type_round_trips(imm in -2048i64..2048, rs1 in 0usize..32, rd in 0usize..32) {
        let d = decode(i_type(imm, rs1, 0, rd, opcodes::OP_IMM));
        prop_assert_eq!(d.imm, imm);
        prop_assert_eq!(d.rs1, rs1);
        prop_assert_eq!(d.rd, rd);
    }

    #[test]
    fn b_type_round_trips(halfwords in -2048i64..2048) {
        let offset = halfwords * 2;
        let d = decode(b_type(offset, 0, 0, 0, opcodes::OP_BRANCH));
        prop_assert_eq!(d.imm, offset);
    }

    #[test]
    fn j_type_round_trips(halfwords in -(1i64 << 19)..(1i64 << 19)) {
        let offset = halfwords * 2;
        let d = decode(j_type(offset, 1, opcodes::OP_JAL));
        prop_assert_eq!(d.imm, offset);
    }
}
