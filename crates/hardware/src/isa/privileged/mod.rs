//! Privileged architecture constants.

/// System instruction encodings and CSR access minor opcodes.
pub mod opcodes;
