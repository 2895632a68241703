//! NS16550A-compatible UART.
//!
//! Eight byte-wide registers; DLAB switches offsets 0/1 to the divisor
//! latch. Transmission is decoupled from the executing hart: THR writes land
//! in a buffer and a dedicated thread (woken through a condition variable)
//! drains it to the console. Interrupt identification is prioritized —
//! receive-data-available outranks transmitter-empty, and reading IIR while
//! THRE is the reported cause clears it.
//!
//! MMIO entry points return `true` when the interrupt line to the PLIC
//! (source 10) should be pulsed; the bus forwards that to the PLIC.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::soc::lock;

/// IIR value: no interrupt pending.
const IIR_NONE: u8 = 0b0001;
/// IIR value: transmitter holding register empty.
const IIR_THRE: u8 = 0b0010;
/// IIR value: received data available.
const IIR_RDA: u8 = 0b0100;

/// IER bit: received-data-available interrupt enable.
const IER_RDA: u8 = 0b01;
/// IER bit: transmitter-empty interrupt enable.
const IER_THRE: u8 = 0b10;

/// LSR bit: data ready.
const LSR_DR: u8 = 0x01;
/// LSR bits: transmitter holding register and shift register empty.
const LSR_IDLE: u8 = 0x60;

/// LCR bit: divisor latch access.
const LCR_DLAB: u8 = 0x80;

#[derive(Debug)]
struct UartState {
    ier: u8,
    lcr: u8,
    mcr: u8,
    scr: u8,
    fcr: u8,
    divisor: u16,
    fifo_trigger: u8,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    /// Transmitter-empty interrupt pending.
    thre_ip: bool,
    /// Receive-data interrupt pending.
    rda_ip: bool,
    shutdown: bool,
}

/// The UART device.
#[derive(Debug)]
pub struct Uart {
    state: Mutex<UartState>,
    tx_cv: Condvar,
}

impl Uart {
    /// Creates the UART in its reset state (transmitter idle, FIFO trigger 1).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(UartState {
                ier: 0,
                lcr: 0,
                mcr: 0,
                scr: 0,
                fcr: 0,
                divisor: 0,
                fifo_trigger: 1,
                rx: VecDeque::new(),
                tx: Vec::new(),
                thre_ip: false,
                rda_ip: false,
                shutdown: false,
            }),
            tx_cv: Condvar::new(),
        }
    }

    fn iir(st: &UartState) -> u8 {
        if st.rda_ip {
            IIR_RDA
        } else if st.thre_ip {
            IIR_THRE
        } else {
            IIR_NONE
        }
    }

    /// MMIO read of one register.
    ///
    /// RBR reads consume a received byte; IIR reads clear a reported
    /// transmitter-empty cause.
    pub fn load(&self, offset: u64) -> u8 {
        let mut st = lock(&self.state);
        let dlab = st.lcr & LCR_DLAB != 0;
        match offset {
            0 => {
                if dlab {
                    st.divisor as u8
                } else {
                    let byte = st.rx.pop_front().unwrap_or(0);
                    if st.rx.is_empty() {
                        st.rda_ip = false;
                    }
                    byte
                }
            }
            1 => {
                if dlab {
                    (st.divisor >> 8) as u8
                } else {
                    st.ier
                }
            }
            2 => {
                let iir = Self::iir(&st);
                if iir == IIR_THRE {
                    st.thre_ip = false;
                }
                iir
            }
            3 => st.lcr,
            4 => st.mcr,
            5 => {
                let mut lsr = 0;
                if !st.rx.is_empty() {
                    lsr |= LSR_DR;
                }
                if st.tx.is_empty() {
                    lsr |= LSR_IDLE;
                }
                lsr
            }
            6 => 0,
            7 => st.scr,
            _ => 0,
        }
    }

    /// MMIO write of one register. Returns `true` when the PLIC line should
    /// be pulsed.
    pub fn store(&self, offset: u64, val: u8) -> bool {
        let mut st = lock(&self.state);
        let dlab = st.lcr & LCR_DLAB != 0;
        match offset {
            0 => {
                if dlab {
                    st.divisor = (st.divisor & 0xFF00) | val as u16;
                } else {
                    st.tx.push(val);
                    st.thre_ip = false;
                    self.tx_cv.notify_one();
                }
                false
            }
            1 => {
                if dlab {
                    st.divisor = (st.divisor & 0x00FF) | ((val as u16) << 8);
                    false
                } else {
                    st.ier = val;
                    if st.ier & IER_THRE != 0 && st.tx.is_empty() && !st.rda_ip {
                        st.thre_ip = true;
                        return true;
                    }
                    false
                }
            }
            2 => {
                st.fcr = val;
                st.fifo_trigger = match val >> 6 {
                    0 => 1,
                    1 => 4,
                    2 => 8,
                    _ => 14,
                };
                false
            }
            3 => {
                st.lcr = val;
                false
            }
            4 => {
                st.mcr = val;
                false
            }
            7 => {
                st.scr = val;
                false
            }
            _ => false,
        }
    }

    /// Queues one received byte. Returns `true` when the FIFO has reached
    /// its trigger level and the receive interrupt is enabled.
    pub fn push_input(&self, byte: u8) -> bool {
        let mut st = lock(&self.state);
        st.rx.push_back(byte);
        if st.rx.len() >= st.fifo_trigger as usize && st.ier & IER_RDA != 0 {
            st.rda_ip = true;
            return true;
        }
        false
    }

    /// Blocks until transmit data is available, then drains it.
    ///
    /// Returns `None` after [`Uart::shutdown`]; the transmit thread exits.
    pub fn wait_tx(&self) -> Option<Vec<u8>> {
        let mut st = lock(&self.state);
        loop {
            if !st.tx.is_empty() {
                return Some(std::mem::take(&mut st.tx));
            }
            if st.shutdown {
                return None;
            }
            st = self
                .tx_cv
                .wait(st)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Drains any buffered transmit data without blocking.
    pub fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut lock(&self.state).tx)
    }

    /// Marks the transmitter idle after a drain. Returns `true` when the
    /// transmitter-empty interrupt should be raised.
    pub fn tx_done(&self) -> bool {
        let mut st = lock(&self.state);
        if st.ier & IER_THRE != 0 {
            if !st.rda_ip {
                st.thre_ip = true;
            }
            return true;
        }
        false
    }

    /// Wakes and terminates the transmit thread.
    pub fn shutdown(&self) {
        lock(&self.state).shutdown = true;
        self.tx_cv.notify_all();
    }
}

impl Default for Uart {
    fn default() -> Self {
        Self::new()
    }
}
