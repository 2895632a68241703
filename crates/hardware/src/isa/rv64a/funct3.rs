//! RV64A funct3 width selectors.

/// 32-bit atomic operation (.W).
pub const AMO_W: u32 = 0b010;
/// 64-bit atomic operation (.D).
pub const AMO_D: u32 = 0b011;
