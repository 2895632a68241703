//! Reset and boot contract tests.

use pretty_assertions::assert_eq;

use crate::common::{TEST_RAM, run_cycles, test_hart};
use rvhart_core::common::constants::{DTB_BASE, RAM_BASE};
use rvhart_core::core::arch::mode::PrivilegeMode;

#[test]
fn reset_state_matches_the_boot_contract() {
    let hart = test_hart();

    assert_eq!(hart.privmode, PrivilegeMode::Machine);
    assert_eq!(hart.pc, 0x1000);
    assert_eq!(hart.regs.read(2), RAM_BASE + TEST_RAM - 1, "sp at top of RAM");
    assert_eq!(hart.regs.read(1), 0x8100_0000, "ra parks in empty memory");
    assert_eq!(hart.regs.read(10), 0, "a0 = hartid");
    assert_eq!(hart.regs.read(11), DTB_BASE, "a1 = dtb address");

    // SXL and UXL read 0b10 (64-bit).
    assert_eq!((hart.csrs.mstatus >> 34) & 0b11, 0b10);
    assert_eq!((hart.csrs.mstatus >> 32) & 0b11, 0b10);

    assert_eq!(hart.csrs.satp, 0);
    assert_eq!(hart.csrs.misa >> 62, 0b10);
    assert_eq!(hart.pmp.addr(0), 0x003F_FFFF_FFFF_FFFF);
    assert_eq!(hart.pmp.cfg(0), 0x1F);
    assert_eq!(hart.csrs.mie, 0b1010_1010_1010);
    assert_eq!(hart.csrs.sie, 0b0010_0010_0010);
}

#[test]
fn boot_rom_jumps_to_ram() {
    let mut hart = test_hart();
    // addi x8, x0, 1; slli x8, x8, 31; jalr x0, x8, 0
    run_cycles(&mut hart, 3);
    assert_eq!(hart.pc, RAM_BASE);
    assert_eq!(hart.regs.read(8), RAM_BASE);
    assert_eq!(hart.csrs.minstret, 3);
    assert_eq!(hart.csrs.mcycle, 3);
}

#[test]
fn register_zero_is_always_zero() {
    let mut hart = test_hart();
    hart.regs.write(0, 0x1234);
    assert_eq!(hart.regs.read(0), 0);

    // addi x0, x0, 5 retires without touching x0.
    crate::common::exec(&mut hart, &[crate::common::addi(0, 0, 5)]);
    assert_eq!(hart.regs.read(0), 0);
}

#[test]
fn counters_mirror_their_machine_twins() {
    let mut hart = test_hart();
    run_cycles(&mut hart, 2);
    assert_eq!(hart.csrs.cycle, hart.csrs.mcycle);
    assert_eq!(hart.csrs.instret, hart.csrs.minstret);
}
