//! CSR file tests: privilege gating, mirrors, normalization, PMP
//! registers, and the fixed/read-only ranges.

use pretty_assertions::assert_eq;

use crate::common::{csr_inst, load_program, nop, run_cycles, test_hart};
use rvhart_core::common::constants::RAM_BASE;
use rvhart_core::core::arch::csr::{
    INT_MSIP, INT_SSIP, M_INT_MASK, MSTATUS_TVM, SSTATUS_SXL_MASK,
};
use rvhart_core::core::arch::mode::PrivilegeMode;
use rvhart_core::isa::privileged::opcodes::{CSRRC, CSRRS, CSRRW};

// CSR addresses used below.
const MSTATUS: u16 = 0x300;
const MISA: u16 = 0x301;
const MIE: u16 = 0x304;
const MSCRATCH: u16 = 0x340;
const SIE: u16 = 0x104;
const SIP: u16 = 0x144;
const SATP: u16 = 0x180;
const CYCLE: u16 = 0xC00;
const TIME: u16 = 0xC01;
const MCOUNTEREN: u16 = 0x306;
const MHPMCOUNTER3: u16 = 0xB03;
const PMPCFG0: u16 = 0x3A0;
const PMPADDR0: u16 = 0x3B0;
const PMPADDR1: u16 = 0x3B1;

#[test]
fn csrrw_round_trips_through_mscratch() {
    let mut hart = test_hart();
    load_program(
        &mut hart,
        RAM_BASE,
        &[
            csr_inst(CSRRW, MSCRATCH, 1, 0),
            csr_inst(CSRRS, MSCRATCH, 0, 5),
            csr_inst(CSRRW, MSCRATCH, 2, 6),
        ],
    );
    hart.regs.write(1, 0xDEAD_BEEF);
    hart.regs.write(2, 0x1234);
    run_cycles(&mut hart, 3);

    assert_eq!(hart.regs.read(5), 0xDEAD_BEEF);
    assert_eq!(hart.regs.read(6), 0xDEAD_BEEF, "csrrw reads the old value");
    assert_eq!(hart.csrs.mscratch, 0x1234);
}

#[test]
fn mstatus_writes_are_normalized_and_mirrored() {
    let mut hart = test_hart();
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRW, MSTATUS, 1, 5)]);
    // Try to set the reserved bits and zero SXL/UXL.
    hart.regs.write(1, 0b10101);
    let old_normalized = hart.csrs.mstatus;
    run_cycles(&mut hart, 1);

    assert_eq!(hart.regs.read(5), old_normalized, "read sees the normalized value");
    assert_eq!(hart.csrs.mstatus & 0b10101, 0, "reserved bits forced clear");
    assert_eq!((hart.csrs.mstatus >> 32) & 0b1111, 0b1010, "SXL/UXL forced to 64-bit");
    assert_eq!(
        hart.csrs.sstatus,
        hart.csrs.mstatus & !SSTATUS_SXL_MASK,
        "sstatus shadow follows every mstatus write"
    );
}

#[test]
fn mie_writes_refresh_the_sie_shadow() {
    let mut hart = test_hart();
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRW, MIE, 1, 0)]);
    hart.regs.write(1, 0xFFF);
    run_cycles(&mut hart, 1);

    assert_eq!(hart.csrs.mie, 0xFFF);
    assert_eq!(hart.csrs.sie, 0xFFF & !M_INT_MASK);
}

#[test]
fn interrupt_csr_writes_request_an_interrupt_check() {
    let mut hart = test_hart();
    // A pending machine software interrupt that nothing has asked the hart
    // to look at yet.
    hart.machine.lines.raise(0, INT_MSIP);
    load_program(&mut hart, RAM_BASE, &[nop(), csr_inst(CSRRS, MIE, 0, 5)]);
    hart.csrs.mtvec = RAM_BASE + 0x100;

    run_cycles(&mut hart, 1);
    assert_eq!(hart.csrs.mcause, 0, "no check requested, no delivery");

    // A write to mie (csrrs with a nonzero register) requests the check;
    // the interrupt is taken at the end of that cycle.
    load_program(&mut hart, RAM_BASE + 4, &[csr_inst(CSRRS, MIE, 5, 0)]);
    hart.regs.write(5, INT_MSIP);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.csrs.mcause, (1 << 63) | 3, "machine software interrupt");
}

#[test]
fn read_only_counters_reject_writes() {
    let mut hart = test_hart();
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRW, CYCLE, 1, 0)]);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.csrs.mcause, 2, "cycle is read-only");

    // Reading it is fine.
    let mut hart = test_hart();
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRS, CYCLE, 0, 5)]);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.csrs.mcause, 0);
}

#[test]
fn hpm_counters_read_zero_and_ignore_writes() {
    let mut hart = test_hart();
    load_program(
        &mut hart,
        RAM_BASE,
        &[
            csr_inst(CSRRW, MHPMCOUNTER3, 1, 0),
            csr_inst(CSRRS, MHPMCOUNTER3, 0, 5),
        ],
    );
    hart.regs.write(1, 0x7777);
    hart.regs.write(5, 0x1111);
    run_cycles(&mut hart, 2);

    assert_eq!(hart.csrs.mcause, 0, "no trap on the read-only-zero range");
    assert_eq!(hart.regs.read(5), 0);
}

#[test]
fn counter_enables_read_a_fixed_value() {
    let mut hart = test_hart();
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRS, MCOUNTEREN, 0, 5)]);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.regs.read(5), 5, "only cycle and instret exist");
}

#[test]
fn time_reads_the_clint_mtime() {
    let mut hart = test_hart();
    hart.machine.clint.set_mtime(12345);
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRS, TIME, 0, 5)]);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.regs.read(5), 12345);
}

#[test]
fn user_mode_cannot_touch_machine_csrs() {
    let mut hart = test_hart();
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRS, MSTATUS, 0, 5)]);
    hart.privmode = PrivilegeMode::User;
    run_cycles(&mut hart, 1);
    assert_eq!(hart.csrs.mcause, 2);
    assert_eq!(hart.privmode, PrivilegeMode::Machine, "trap lands in M-mode");
}

#[test]
fn misa_writes_are_dropped() {
    let mut hart = test_hart();
    let before = hart.csrs.misa;
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRW, MISA, 1, 0)]);
    hart.regs.write(1, 0);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.csrs.misa, before);
    assert_eq!(hart.csrs.mcause, 0);
}

#[test]
fn satp_access_traps_under_tvm() {
    let mut hart = test_hart();
    let mstatus = hart.csrs.mstatus | MSTATUS_TVM;
    hart.csrs.set_mstatus(mstatus);
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRS, SATP, 0, 5)]);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.csrs.mcause, 2);
}

#[test]
fn sie_and_sip_mask_machine_interrupt_bits() {
    let mut hart = test_hart();
    hart.machine.lines.raise(0, INT_MSIP | INT_SSIP);
    load_program(
        &mut hart,
        RAM_BASE,
        &[
            csr_inst(CSRRS, SIP, 0, 5),  // read sip
            csr_inst(CSRRC, SIP, 6, 0),  // try to clear MSIP through sip
            csr_inst(CSRRC, SIE, 7, 0),  // try to clear machine bits of mie
        ],
    );
    // Keep interrupts from being delivered while we poke at them.
    let mstatus = hart.csrs.mstatus & !0b1010;
    hart.csrs.set_mstatus(mstatus);
    hart.regs.write(6, INT_MSIP | INT_SSIP);
    hart.regs.write(7, M_INT_MASK);
    run_cycles(&mut hart, 3);

    assert_eq!(hart.regs.read(5), INT_SSIP, "sip hides machine bits");
    assert_eq!(
        hart.machine.lines.mip(0) & INT_MSIP,
        INT_MSIP,
        "MSIP survives clears through sip"
    );
    assert_eq!(hart.machine.lines.mip(0) & INT_SSIP, 0, "SSIP cleared");
    assert_eq!(
        hart.csrs.mie & M_INT_MASK,
        M_INT_MASK,
        "machine enables survive clears through sie"
    );
}

#[test]
fn odd_pmpcfg_addresses_are_illegal() {
    let mut hart = test_hart();
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRS, PMPCFG0 + 1, 0, 5)]);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.csrs.mcause, 2);
}

#[test]
fn pmpcfg_packs_eight_entries() {
    let mut hart = test_hart();
    load_program(
        &mut hart,
        RAM_BASE,
        &[
            csr_inst(CSRRW, PMPCFG0, 1, 5),
            csr_inst(CSRRS, PMPCFG0, 0, 6),
        ],
    );
    // Keep entry 0 open; entry 1 = TOR|RW, entry 2 = NAPOT|R.
    hart.regs.write(1, 0x1F | (0x0B << 8) | (0x19 << 16));
    run_cycles(&mut hart, 2);

    assert_eq!(hart.regs.read(5) & 0xFF, 0x1F, "old value packs entry 0");
    assert_eq!(hart.pmp.cfg(1), 0x0B);
    assert_eq!(hart.pmp.cfg(2), 0x19);
    assert_eq!(hart.regs.read(6), 0x1F | (0x0B << 8) | (0x19 << 16));
}

#[test]
fn locked_pmp_entries_are_frozen_until_reset() {
    let mut hart = test_hart();
    load_program(
        &mut hart,
        RAM_BASE,
        &[
            csr_inst(CSRRW, PMPADDR1, 1, 0),  // program the address
            csr_inst(CSRRW, PMPCFG0, 2, 0),   // lock entry 1 (NAPOT | R, L)
            csr_inst(CSRRW, PMPADDR1, 3, 0),  // must be dropped
            csr_inst(CSRRW, PMPCFG0, 4, 0),   // must be dropped for entry 1
        ],
    );
    hart.regs.write(1, 0x2000_0FFF);
    hart.regs.write(2, 0x99u64 << 8); // L | NAPOT | R for entry 1
    hart.regs.write(3, 0);
    hart.regs.write(4, 0);
    run_cycles(&mut hart, 4);

    assert_eq!(hart.pmp.cfg(1), 0x99);
    assert_eq!(hart.pmp.addr(1), 0x2000_0FFF);
    assert!(hart.pmp.addr_locked(1));
}

#[test]
fn pmpaddr_writes_mask_to_54_bits() {
    let mut hart = test_hart();
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRW, PMPADDR0 + 2, 1, 0)]);
    hart.regs.write(1, u64::MAX);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.pmp.addr(2), 0x003F_FFFF_FFFF_FFFF);
}

#[test]
fn unknown_csrs_raise_illegal_instruction() {
    let mut hart = test_hart();
    load_program(&mut hart, RAM_BASE, &[csr_inst(CSRRS, 0x123, 0, 5)]);
    run_cycles(&mut hart, 1);
    assert_eq!(hart.csrs.mcause, 2);
}
