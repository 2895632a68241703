//! Emulator configuration.
//!
//! A small serde-backed hierarchy with defaults matching the reference
//! platform: 512 MiB of RAM, one hart, wall-clock machine timer. The CLI
//! populates it from flags.

use serde::{Deserialize, Serialize};

use crate::common::constants::DEFAULT_RAM_SIZE;

/// Machine topology and memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Guest RAM size in bytes.
    pub ram_size: u64,
    /// Number of harts.
    pub hart_count: u16,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            ram_size: DEFAULT_RAM_SIZE,
            hart_count: 1,
        }
    }
}

/// Machine timer behaviour.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Tick `mtime` once per retired cycle instead of at 10 MHz wall clock.
    /// Slower, but deterministic across runs.
    pub slow_mtimer: bool,
}

/// Root configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Machine topology and memory.
    pub machine: MachineConfig,
    /// Machine timer behaviour.
    pub timer: TimerConfig,
    /// Compliance-signature mode: the halt sentinel stops the hart and the
    /// signature region is dumped at exit.
    pub signature_mode: bool,
}
