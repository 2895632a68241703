//! RV64I funct7 minor opcodes (bits 31-25).

/// Base ALU operations (ADD, SLL, SRL, ...).
pub const BASE: u32 = 0b0000000;

/// Alternate ALU operations (SUB, SRA); bit 30 of the instruction.
pub const ALT: u32 = 0b0100000;

/// Integer multiply/divide (M extension).
pub const MULDIV: u32 = 0b0000001;

/// Bit 30 of the instruction word selects SUB over ADD and SRA over SRL.
pub const ALT_BIT: u32 = 1 << 30;
