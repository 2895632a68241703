//! The multi-threaded runner.
//!
//! One OS thread per hart plus the coordinator (this thread), which every
//! ~5 ms re-evaluates timer/software interrupt lines, drains console input
//! into the UART, re-dispatches the PLIC, and asks every hart to re-check
//! pending interrupts. UART transmission runs on its own thread behind the
//! device's condition variable.
//!
//! SIGINT requests shutdown; hart threads observe the flag between cycles.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::common::constants::{RAM_BASE, SIGNATURE_LEN, SIGNATURE_OFFSET};
use crate::core::Hart;
use crate::sim::console::Console;
use crate::sim::loader::SignatureBounds;
use crate::soc::Machine;
use crate::soc::devices::plic::PLIC_SRC_UART;

/// Coordinator housekeeping period.
const TICK_PERIOD: Duration = Duration::from_micros(5000);

/// Runner behaviour beyond the machine configuration.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Write the signature region to this file at exit.
    pub signature_file: Option<String>,
    /// Signature region from ELF symbols; the fixed platform region is
    /// used when absent.
    pub signature_bounds: Option<SignatureBounds>,
    /// Dump all of RAM to `mem_dump` at exit.
    pub dump_mem: bool,
    /// Attach the UART to a pseudo-terminal instead of stdio.
    pub use_pty: bool,
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn sigint_handler(_signum: libc::c_int) {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

fn install_sigint() {
    let handler: extern "C" fn(libc::c_int) = sigint_handler;
    // SAFETY: installing a signal handler that only touches an atomic.
    unsafe {
        let _ = libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
}

/// Boots every hart and runs until a hart halts or SIGINT arrives.
pub fn run(machine: &Arc<Machine>, opts: &RunOptions) {
    install_sigint();
    let console = Arc::new(Console::new(opts.use_pty));

    let mut hart_threads = Vec::new();
    for hartid in 0..machine.hart_count() {
        let machine = Arc::clone(machine);
        hart_threads.push(thread::spawn(move || {
            let mut hart = Hart::new(Arc::clone(&machine), hartid);
            while hart.cycle() {
                if machine.halted() {
                    return;
                }
            }
            // One halting hart stops the machine.
            machine.halt();
        }));
    }

    let tx_thread = {
        let machine = Arc::clone(machine);
        let console = Arc::clone(&console);
        thread::spawn(move || {
            while let Some(bytes) = machine.uart.wait_tx() {
                console.write_bytes(&bytes);
                if machine.uart.tx_done() {
                    machine.plic.raise(PLIC_SRC_UART, &machine.lines);
                }
            }
        })
    };

    while !machine.halted() {
        if INTERRUPTED.load(Ordering::Relaxed) {
            tracing::info!("interrupted, shutting down");
            machine.halt();
            break;
        }

        machine.tick_devices();
        while let Some(byte) = console.read_byte() {
            if machine.uart.push_input(byte) {
                machine.plic.raise(PLIC_SRC_UART, &machine.lines);
            }
        }
        machine.lines.request_check_all();

        thread::sleep(TICK_PERIOD);
    }

    machine.halt();
    for handle in hart_threads {
        let _ = handle.join();
    }
    let _ = tx_thread.join();
    console.write_bytes(&machine.uart.take_tx());

    if let Some(ref path) = opts.signature_file {
        write_signature(machine, opts.signature_bounds, path);
    }
    if opts.dump_mem {
        let all = machine.ram.read_slice(0, machine.ram.len());
        if let Err(err) = fs::write("mem_dump", all) {
            tracing::warn!(%err, "could not dump memory");
        }
    }
}

/// Writes the signature region; failure to open the file is not fatal.
fn write_signature(machine: &Machine, bounds: Option<SignatureBounds>, path: &str) {
    let (offset, len) = match bounds {
        Some(b) if b.end > b.begin && b.begin >= RAM_BASE => {
            ((b.begin - RAM_BASE) as usize, (b.end - b.begin) as usize)
        }
        _ => (SIGNATURE_OFFSET as usize, SIGNATURE_LEN),
    };
    if offset + len > machine.ram.len() {
        tracing::warn!("signature region lies outside RAM, not dumped");
        return;
    }
    match fs::write(path, machine.ram.read_slice(offset, len)) {
        Ok(()) => tracing::info!(path, len, "signature written"),
        Err(err) => tracing::warn!(%err, "unable to open signature file for writing"),
    }
}
