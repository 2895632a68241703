//! Shared test harness: machine/hart construction and instruction encoders.
#![allow(dead_code)]

use std::sync::Arc;

use rvhart_core::common::constants::RAM_BASE;
use rvhart_core::config::Config;
use rvhart_core::{Hart, Machine};

/// RAM size for test machines (16 MiB is enough for page tables and the
/// signature region).
pub const TEST_RAM: u64 = 0x100_0000;

/// A machine with deterministic time and a small RAM.
pub fn test_machine() -> Arc<Machine> {
    test_machine_with(|_| {})
}

/// A machine with the given tweaks applied to the default test config.
pub fn test_machine_with(tweak: impl FnOnce(&mut Config)) -> Arc<Machine> {
    let mut config = Config::default();
    config.machine.ram_size = TEST_RAM;
    config.timer.slow_mtimer = true;
    tweak(&mut config);
    Machine::new(config)
}

/// A single hart on a fresh test machine.
pub fn test_hart() -> Hart {
    Hart::new(test_machine(), 0)
}

/// Writes a sequence of 32-bit instruction words at `addr` and points the
/// hart there.
pub fn load_program(hart: &mut Hart, addr: u64, words: &[u32]) {
    for (i, word) in words.iter().enumerate() {
        hart.machine
            .phys_store(addr + 4 * i as u64, 4, *word as u64)
            .unwrap();
    }
    hart.pc = addr;
}

/// Runs `n` cycles.
pub fn run_cycles(hart: &mut Hart, n: usize) {
    for _ in 0..n {
        let _ = hart.cycle();
    }
}

/// Writes one program at the start of RAM and executes it to completion.
pub fn exec(hart: &mut Hart, words: &[u32]) {
    load_program(hart, RAM_BASE, words);
    run_cycles(hart, words.len());
}

// ── Instruction encoders ──────────────────────────────────────────────

/// R-type encoder.
pub fn r_type(f7: u32, rs2: usize, rs1: usize, f3: u32, rd: usize, op: u32) -> u32 {
    (f7 << 25) | ((rs2 as u32) << 20) | ((rs1 as u32) << 15) | (f3 << 12) | ((rd as u32) << 7) | op
}

/// I-type encoder (also used for CSR instructions with `imm` = address).
pub fn i_type(imm: i64, rs1: usize, f3: u32, rd: usize, op: u32) -> u32 {
    (((imm as u32) & 0xFFF) << 20) | ((rs1 as u32) << 15) | (f3 << 12) | ((rd as u32) << 7) | op
}

/// S-type encoder.
pub fn s_type(imm: i64, rs2: usize, rs1: usize, f3: u32, op: u32) -> u32 {
    let imm = imm as u32;
    ((imm >> 5 & 0x7F) << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (f3 << 12)
        | ((imm & 0x1F) << 7)
        | op
}

/// B-type encoder from a byte offset.
pub fn b_type(imm: i64, rs2: usize, rs1: usize, f3: u32, op: u32) -> u32 {
    let imm = imm as u32;
    ((imm >> 12 & 1) << 31)
        | ((imm >> 5 & 0x3F) << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (f3 << 12)
        | ((imm >> 1 & 0xF) << 8)
        | ((imm >> 11 & 1) << 7)
        | op
}

/// J-type encoder from a byte offset.
pub fn j_type(imm: i64, rd: usize, op: u32) -> u32 {
    let imm = imm as u32;
    ((imm >> 20 & 1) << 31)
        | ((imm >> 1 & 0x3FF) << 21)
        | ((imm >> 11 & 1) << 20)
        | ((imm >> 12 & 0xFF) << 12)
        | ((rd as u32) << 7)
        | op
}

/// `addi rd, rs1, imm`.
pub fn addi(rd: usize, rs1: usize, imm: i64) -> u32 {
    i_type(imm, rs1, 0b000, rd, 0b0010011)
}

/// `nop` (`addi x0, x0, 0`).
pub fn nop() -> u32 {
    addi(0, 0, 0)
}

/// CSR instruction encoder; `f3` picks CSRRW/CSRRS/CSRRC or the immediate
/// forms, `src` is rs1 or the 5-bit immediate.
pub fn csr_inst(f3: u32, csr: u16, src: usize, rd: usize) -> u32 {
    i_type(csr as i64, src, f3, rd, 0b1110011)
}
