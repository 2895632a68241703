//! RV64I base integer instruction set constants.

/// Major opcodes.
pub mod opcodes;

/// funct3 minor opcodes.
pub mod funct3;

/// funct7 minor opcodes.
pub mod funct7;
