//! Memory management: PMP, TLB, and the page-table walker.

/// Physical memory protection engine.
pub mod pmp;

/// Page-table walker for Sv39/Sv48/Sv57.
pub mod ptw;

/// Translation lookaside buffer.
pub mod tlb;
