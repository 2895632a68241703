//! Integer register file.

use std::fmt;

/// The 32 integer registers of a hart.
///
/// `x0` is hardwired to zero: writes to index 0 are dropped, so the
/// observable value of register zero is always 0.
#[derive(Clone, Default)]
pub struct RegisterFile {
    regs: [u64; 32],
}

impl RegisterFile {
    /// Creates a register file with all registers zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads register `idx`.
    #[inline(always)]
    pub fn read(&self, idx: usize) -> u64 {
        self.regs[idx]
    }

    /// Writes register `idx`; writes to x0 are dropped.
    #[inline(always)]
    pub fn write(&mut self, idx: usize, val: u64) {
        if idx != 0 {
            self.regs[idx] = val;
        }
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.regs.chunks(2).enumerate() {
            writeln!(
                f,
                "x{:<2}:{:#018x} x{:<2}:{:#018x}",
                i * 2,
                chunk[0],
                i * 2 + 1,
                chunk[1]
            )?;
        }
        Ok(())
    }
}
