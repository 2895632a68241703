//! Platform-level interrupt controller.
//!
//! Routes external interrupt sources to hart contexts. Contexts interleave
//! machine and supervisor targets per hart: context `2h` is hart `h`
//! machine mode (raises MEIP), context `2h + 1` is hart `h` supervisor mode
//! (raises SEIP).
//!
//! # Memory Map
//!
//! * `0x000000` — per-source priorities (one word each)
//! * `0x001000` — pending bitmap
//! * `0x002000 + 0x80·ctx` — per-context enable bitmap
//! * `0x200000 + 0x1000·ctx` — per-context threshold; claim/complete at `+4`

use std::sync::Mutex;

use crate::core::arch::csr::{INT_MEIP, INT_SEIP};
use crate::soc::intr::IntLines;
use crate::soc::lock;

/// Number of interrupt sources (source 0 is reserved).
pub const PLIC_SOURCE_COUNT: usize = 32;

/// The UART's interrupt source number.
pub const PLIC_SRC_UART: u16 = 10;

/// Offset of the pending bitmap.
const PENDING_BASE: u64 = 0x1000;

/// Offset of the per-context enable bitmaps.
const ENABLE_BASE: u64 = 0x2000;

/// Stride between per-context enable bitmaps in bytes.
const ENABLE_STRIDE: u64 = 0x80;

/// Offset of the per-context threshold/claim blocks.
const CONTEXT_BASE: u64 = 0x20_0000;

/// Stride between per-context threshold/claim blocks in bytes.
const CONTEXT_STRIDE: u64 = 0x1000;

#[derive(Debug)]
struct PlicState {
    priority: [u32; PLIC_SOURCE_COUNT],
    pending: u32,
    /// One enable word per context (32 sources fit one word).
    enable: Vec<u32>,
    threshold: Vec<u32>,
    /// True while the context is between claim and complete.
    handling: Vec<bool>,
}

/// The PLIC device.
#[derive(Debug)]
pub struct Plic {
    state: Mutex<PlicState>,
    contexts: usize,
}

impl Plic {
    /// Creates a PLIC with two contexts (M and S) per hart.
    pub fn new(harts: usize) -> Self {
        let contexts = 2 * harts;
        Self {
            state: Mutex::new(PlicState {
                priority: [0; PLIC_SOURCE_COUNT],
                pending: 0,
                enable: vec![0; contexts],
                threshold: vec![0; contexts],
                handling: vec![false; contexts],
            }),
            contexts,
        }
    }

    /// Marks `source` pending and dispatches it to eligible contexts.
    ///
    /// A still-pending source is not re-posted.
    pub fn raise(&self, source: u16, lines: &IntLines) {
        let mut st = lock(&self.state);
        let bit = 1u32 << (source as u32 % 32);
        if st.pending & bit != 0 {
            return;
        }
        st.pending |= bit;
        Self::dispatch_source(&st, source, self.contexts, lines);
    }

    /// Re-dispatches every pending source; the coordinator calls this
    /// periodically so enables/thresholds written after a post still take
    /// effect.
    pub fn dispatch_pending(&self, lines: &IntLines) {
        let st = lock(&self.state);
        for source in 1..PLIC_SOURCE_COUNT as u16 {
            if st.pending & (1 << (source as u32 % 32)) != 0 {
                Self::dispatch_source(&st, source, self.contexts, lines);
            }
        }
    }

    fn dispatch_source(st: &PlicState, source: u16, contexts: usize, lines: &IntLines) {
        let prio = st.priority[source as usize % PLIC_SOURCE_COUNT];
        for ctx in 0..contexts {
            if !st.handling[ctx]
                && st.threshold[ctx] < prio
                && st.enable[ctx] & (1 << (source as u32 % 32)) != 0
            {
                Self::notify(ctx, true, lines);
            }
        }
    }

    /// Asserts or clears the external-interrupt line of a context's hart.
    fn notify(ctx: usize, assert: bool, lines: &IntLines) {
        let hart = (ctx / 2) as u16;
        let bit = if ctx % 2 == 1 { INT_SEIP } else { INT_MEIP };
        if assert {
            lines.raise(hart, bit);
        } else {
            lines.clear(hart, bit);
        }
    }

    /// MMIO read. Claim reads select and consume the highest-priority
    /// pending enabled source for the context.
    pub fn load(&self, offset: u64) -> u64 {
        let mut st = lock(&self.state);
        let word = offset / 4;
        if (word as usize) < PLIC_SOURCE_COUNT {
            return st.priority[word as usize] as u64;
        }
        if offset >= PENDING_BASE && offset < ENABLE_BASE {
            return if offset == PENDING_BASE { st.pending as u64 } else { 0 };
        }
        if offset >= ENABLE_BASE && offset < CONTEXT_BASE {
            let ctx = ((offset - ENABLE_BASE) / ENABLE_STRIDE) as usize;
            let within = (offset - ENABLE_BASE) % ENABLE_STRIDE;
            if ctx < self.contexts && within == 0 {
                return st.enable[ctx] as u64;
            }
            return 0;
        }
        if offset >= CONTEXT_BASE {
            let ctx = ((offset - CONTEXT_BASE) / CONTEXT_STRIDE) as usize;
            if ctx >= self.contexts {
                return 0;
            }
            match offset & 0xFFF {
                0 => return st.threshold[ctx] as u64,
                4 => {
                    let claimed = Self::claim(&st, ctx);
                    if claimed != 0 {
                        st.pending &= !(1 << (claimed % 32));
                        st.handling[ctx] = true;
                    }
                    return claimed as u64;
                }
                _ => return 0,
            }
        }
        0
    }

    /// Selects the highest-priority pending enabled source for `ctx`.
    fn claim(st: &PlicState, ctx: usize) -> u32 {
        let mut best_prio = st.threshold[ctx];
        let mut best = 0u32;
        for source in 1..PLIC_SOURCE_COUNT as u32 {
            let bit = 1u32 << (source % 32);
            if st.pending & bit != 0
                && st.enable[ctx] & bit != 0
                && st.priority[source as usize] > best_prio
            {
                best_prio = st.priority[source as usize];
                best = source;
            }
        }
        best
    }

    /// MMIO write. A complete write ends the context's claim window and
    /// drops its external-interrupt line.
    pub fn store(&self, offset: u64, val: u64, lines: &IntLines) {
        let mut st = lock(&self.state);
        let val = val as u32;
        let word = offset / 4;
        if (word as usize) < PLIC_SOURCE_COUNT {
            st.priority[word as usize] = val;
            return;
        }
        if offset >= PENDING_BASE && offset < ENABLE_BASE {
            if offset == PENDING_BASE {
                st.pending = val;
            }
            return;
        }
        if offset >= ENABLE_BASE && offset < CONTEXT_BASE {
            let ctx = ((offset - ENABLE_BASE) / ENABLE_STRIDE) as usize;
            let within = (offset - ENABLE_BASE) % ENABLE_STRIDE;
            if ctx < self.contexts && within == 0 {
                // Source 0 does not exist and cannot be enabled.
                st.enable[ctx] = val & !1;
            }
            return;
        }
        if offset >= CONTEXT_BASE {
            let ctx = ((offset - CONTEXT_BASE) / CONTEXT_STRIDE) as usize;
            if ctx >= self.contexts {
                return;
            }
            match offset & 0xFFF {
                0 => st.threshold[ctx] = val,
                4 => {
                    st.handling[ctx] = false;
                    Self::notify(ctx, false, lines);
                }
                _ => {}
            }
        }
    }
}
