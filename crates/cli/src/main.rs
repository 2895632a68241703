//! RV64IMAC full-system emulator CLI.
//!
//! Loads firmware/kernel/initrd/DTB images into the machine and runs it.
//! Exit codes: 0 on success, 1-4 for firmware/kernel/dtb/initrd load
//! failures, -1 when neither a firmware nor a kernel was given.

use clap::Parser;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use rvhart_core::Machine;
use rvhart_core::config::Config;
use rvhart_core::sim::loader::{self, BootImages};
use rvhart_core::sim::runner::{self, RunOptions};

#[derive(Parser, Debug)]
#[command(
    name = "rvhart",
    version,
    about = "RV64IMAC full-system emulator",
    long_about = "Boots firmware and kernel images on an emulated multi-hart RV64IMAC \
machine with Sv39/48/57 virtual memory, PMP, ACLINT, PLIC, an NS16550A UART, \
and a stub virtio-mmio block device.\n\nExamples:\n  rvhart -f fw_jump.bin -k Image -d board.dtb\n  rvhart -f none -k kernel.elf -m 0x40000000 -c 4"
)]
struct Cli {
    /// Firmware image (ELF or raw); "none" skips firmware.
    #[arg(short = 'f', long, value_name = "PATH")]
    firmware: Option<String>,

    /// Kernel image; loaded 0x200000 past the firmware, or at the RAM base
    /// without one.
    #[arg(short = 'k', long, value_name = "PATH")]
    kernel: Option<String>,

    /// Initrd image; loaded at RAM + 0x8200000.
    #[arg(short = 'i', long, value_name = "PATH")]
    initrd: Option<String>,

    /// RAM size in bytes (decimal or 0x-prefixed hex).
    #[arg(short = 'm', long, value_name = "BYTES", value_parser = parse_int)]
    mem_size: Option<u64>,

    /// Number of harts.
    #[arg(short = 'c', long, value_name = "N")]
    harts: Option<u16>,

    /// Device tree blob, mapped at physical 0x1100.
    #[arg(short = 'd', long, value_name = "PATH")]
    dtb: Option<String>,

    /// Signature mode: halt on the signature sentinel and write the
    /// signature region to this file at exit.
    #[arg(short = 's', long, value_name = "PATH")]
    signature: Option<String>,

    /// Dump all of RAM to "mem_dump" at exit.
    #[arg(short = 'e', long)]
    dump_mem: bool,

    /// Disable PTY creation; wire the UART to stdio.
    #[arg(short = 'p', long)]
    no_pty: bool,

    /// Tick mtime once per cycle instead of wall clock (deterministic).
    #[arg(long)]
    slow_mtimer: bool,
}

fn parse_int(s: &str) -> Result<u64, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid number {:?}: {}", s, e))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let firmware = cli.firmware.filter(|f| f != "none");
    if firmware.is_none() && cli.kernel.is_none() {
        tracing::error!("neither a firmware nor a kernel image was given");
        process::exit(-1);
    }

    let mut config = Config::default();
    if let Some(size) = cli.mem_size {
        config.machine.ram_size = size;
    }
    if let Some(harts) = cli.harts {
        config.machine.hart_count = harts.max(1);
    }
    config.timer.slow_mtimer = cli.slow_mtimer;
    config.signature_mode = cli.signature.is_some();

    let machine: Arc<Machine> = Machine::new(config);

    let images = BootImages {
        firmware,
        kernel: cli.kernel,
        initrd: cli.initrd,
        dtb: cli.dtb,
    };
    let signature_bounds =
        match loader::load_boot_images(&machine, &images, machine.config().signature_mode) {
            Ok(bounds) => bounds,
            Err(err) => {
                tracing::error!(%err, "image load failed");
                process::exit(err.exit_code());
            }
        };

    let opts = RunOptions {
        signature_file: cli.signature,
        signature_bounds,
        dump_mem: cli.dump_mem,
        use_pty: !cli.no_pty,
    };
    runner::run(&machine, &opts);
}
