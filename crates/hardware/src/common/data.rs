//! Memory access intent and fault classification.

/// The intent of a memory access, as seen by translation and protection.
///
/// The intent selects which PTE/PMP permission bit must be present and which
/// trap family a failure maps to (instruction/load/store).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Instruction fetch (requires X).
    Fetch,
    /// Data load (requires R, or X when `mstatus.MXR` is set).
    Read,
    /// Data store or AMO (requires W).
    Write,
}

/// Outcome of a failed memory access.
///
/// Faults are converted into the appropriate [`Trap`](super::Trap) variant at
/// the executor's access sites, where the access intent and faulting address
/// are known. The two variants are mutually exclusive by construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemFault {
    /// The access violated PMP or targeted an unmapped physical region.
    Access,
    /// Address translation failed.
    Page,
}
