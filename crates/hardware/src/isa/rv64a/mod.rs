//! RV64A atomic extension constants.

/// funct3 width selectors.
pub mod funct3;

/// funct5 operation selectors.
pub mod funct5;
