//! ABI register names used by the boot contract.

/// Return address (x1).
pub const REG_RA: usize = 1;
/// Stack pointer (x2).
pub const REG_SP: usize = 2;
/// First argument register (x10).
pub const REG_A0: usize = 10;
/// Second argument register (x11).
pub const REG_A1: usize = 11;
