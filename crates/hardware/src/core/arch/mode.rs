//! Privilege modes.

/// RISC-V privilege mode levels.
///
/// Machine mode is the highest privilege level; the ordering of the enum
/// matches the architectural encoding so modes compare correctly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrivilegeMode {
    /// User mode (U), for application code.
    User = 0,
    /// Supervisor mode (S), for operating system kernels.
    Supervisor = 1,
    /// Machine mode (M), for firmware.
    Machine = 3,
}

impl PrivilegeMode {
    /// Decodes a privilege mode from its architectural encoding.
    ///
    /// The reserved encoding 2 decodes to machine mode; it cannot be
    /// produced by well-formed `mstatus` updates.
    pub fn from_bits(val: u64) -> Self {
        match val & 0b11 {
            0 => PrivilegeMode::User,
            1 => PrivilegeMode::Supervisor,
            _ => PrivilegeMode::Machine,
        }
    }

    /// Returns the architectural encoding of this mode.
    #[inline(always)]
    pub fn bits(self) -> u64 {
        self as u64
    }
}

impl std::fmt::Display for PrivilegeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PrivilegeMode::User => "User",
            PrivilegeMode::Supervisor => "Supervisor",
            PrivilegeMode::Machine => "Machine",
        };
        write!(f, "{}", name)
    }
}
