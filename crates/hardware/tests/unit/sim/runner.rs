//! End-to-end runner test: boot through the ROM, halt on the signature
//! sentinel, and dump the signature region.

use pretty_assertions::assert_eq;

use crate::common::test_machine_with;
use rvhart_core::common::constants::{RAM_BASE, SIGNATURE_HALT_WORD, SIGNATURE_OFFSET};
use rvhart_core::sim::runner::{RunOptions, run};

#[test]
fn signature_run_halts_and_dumps() {
    let machine = test_machine_with(|c| c.signature_mode = true);

    // The boot ROM jumps to the RAM base, where the sentinel halts.
    machine
        .phys_store(RAM_BASE, 4, SIGNATURE_HALT_WORD as u64)
        .unwrap();
    let pattern: Vec<u8> = (0..=255u8).chain(0..=255u8).collect();
    assert!(machine.load_blob(RAM_BASE + SIGNATURE_OFFSET, &pattern));

    let dir = tempfile::tempdir().unwrap();
    let sig_path = dir.path().join("signature");
    let opts = RunOptions {
        signature_file: Some(sig_path.to_string_lossy().into_owned()),
        signature_bounds: None,
        dump_mem: false,
        use_pty: false,
    };
    run(&machine, &opts);

    let written = std::fs::read(&sig_path).unwrap();
    assert_eq!(written.len(), 512);
    assert_eq!(written, pattern);
}
