//! UART tests: register file, DLAB, FIFO trigger levels, and the
//! prioritized interrupt identification.

use pretty_assertions::assert_eq;
use rstest::rstest;

use rvhart_core::soc::devices::Uart;

const RBR: u64 = 0;
const IER: u64 = 1;
const IIR: u64 = 2;
const FCR: u64 = 2;
const LCR: u64 = 3;
const LSR: u64 = 5;
const SCR: u64 = 7;

const IIR_NONE: u8 = 0b0001;
const IIR_THRE: u8 = 0b0010;
const IIR_RDA: u8 = 0b0100;

#[test]
fn transmit_bytes_are_buffered_until_drained() {
    let uart = Uart::new();
    assert!(!uart.store(0, b'h'));
    assert!(!uart.store(0, b'i'));
    assert_eq!(uart.take_tx(), b"hi");
    assert_eq!(uart.take_tx(), b"");
}

#[test]
fn lsr_reflects_transmitter_and_receiver_state() {
    let uart = Uart::new();
    assert_eq!(uart.load(LSR), 0x60, "idle transmitter, no data");

    let _ = uart.store(0, b'x');
    assert_eq!(uart.load(LSR) & 0x60, 0, "transmit in flight");
    let _ = uart.take_tx();
    assert_eq!(uart.load(LSR), 0x60);

    let _ = uart.push_input(b'a');
    assert_eq!(uart.load(LSR) & 1, 1, "data ready");
}

#[test]
fn dlab_switches_the_divisor_latch() {
    let uart = Uart::new();
    let _ = uart.store(LCR, 0x80);
    let _ = uart.store(0, 0x34);
    let _ = uart.store(1, 0x12);
    assert_eq!(uart.load(0), 0x34);
    assert_eq!(uart.load(1), 0x12);

    // With DLAB off the same offsets are RBR/IER again.
    let _ = uart.store(LCR, 0);
    assert_eq!(uart.load(1), 0, "IER reset value");
    assert_eq!(uart.load(0), 0, "empty receive FIFO reads zero");
}

#[test]
fn received_bytes_come_back_in_order() {
    let uart = Uart::new();
    let _ = uart.push_input(b'a');
    let _ = uart.push_input(b'b');
    assert_eq!(uart.load(RBR), b'a');
    assert_eq!(uart.load(RBR), b'b');
    assert_eq!(uart.load(RBR), 0);
}

#[test]
fn receive_interrupt_needs_enable_and_trigger() {
    let uart = Uart::new();
    // Not enabled: no interrupt.
    assert!(!uart.push_input(b'a'));

    let uart = Uart::new();
    let _ = uart.store(IER, 0b01);
    assert!(uart.push_input(b'a'), "trigger level 1 reached");
    assert_eq!(uart.load(IIR), IIR_RDA);
}

#[rstest]
#[case(0b00 << 6, 1)]
#[case(0b01 << 6, 4)]
#[case(0b10 << 6, 8)]
#[case(0b11 << 6, 14)]
fn fifo_trigger_levels(#[case] fcr: u8, #[case] level: usize) {
    let uart = Uart::new();
    let _ = uart.store(IER, 0b01);
    let _ = uart.store(FCR, fcr);

    for i in 1..level {
        assert!(!uart.push_input(b'x'), "below trigger at {}", i);
    }
    assert!(uart.push_input(b'x'), "trigger level {} reached", level);
}

#[test]
fn iir_prioritizes_receive_over_transmit() {
    let uart = Uart::new();
    let _ = uart.store(IER, 0b11);
    let _ = uart.store(0, b'x');
    let _ = uart.take_tx();
    assert!(uart.tx_done(), "transmit-empty wants an interrupt");

    let _ = uart.push_input(b'a');
    assert_eq!(uart.load(IIR), IIR_RDA, "receive outranks transmit");

    // Drain the receiver; the transmit cause comes through next.
    assert_eq!(uart.load(RBR), b'a');
    assert_eq!(uart.load(IIR), IIR_THRE);
}

#[test]
fn reading_iir_clears_the_thre_cause() {
    let uart = Uart::new();
    assert!(uart.store(IER, 0b10), "enabling THRE with an idle transmitter asserts");
    assert_eq!(uart.load(IIR), IIR_THRE);
    assert_eq!(uart.load(IIR), IIR_NONE, "cleared by the read");
}

#[test]
fn scratch_register_is_plain_storage() {
    let uart = Uart::new();
    let _ = uart.store(SCR, 0x5A);
    assert_eq!(uart.load(SCR), 0x5A);
}

#[test]
fn tx_thread_handshake_drains_and_terminates() {
    use std::sync::Arc;
    let uart = Arc::new(Uart::new());

    let worker = {
        let uart = Arc::clone(&uart);
        std::thread::spawn(move || {
            let mut collected = Vec::new();
            while let Some(bytes) = uart.wait_tx() {
                collected.extend_from_slice(&bytes);
            }
            collected
        })
    };

    let _ = uart.store(0, b'o');
    let _ = uart.store(0, b'k');
    // Give the worker a chance to drain before shutdown.
    std::thread::sleep(std::time::Duration::from_millis(20));
    uart.shutdown();
    let collected = worker.join().unwrap();
    assert_eq!(collected, b"ok");
}
