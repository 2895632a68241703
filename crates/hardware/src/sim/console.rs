//! Host console for the guest UART.
//!
//! Two backends: a pseudo-terminal (the default — external tools attach to
//! the slave side, keeping the emulator's own stdio for diagnostics), or
//! raw-mode non-blocking stdio when the PTY is disabled or unavailable.
//! Terminal attributes are restored on drop.

use std::io::{self, Write};
use std::os::unix::io::RawFd;

#[derive(Clone, Copy)]
enum Backend {
    Stdio,
    Pty { master: RawFd },
}

/// The guest-visible serial console.
pub struct Console {
    backend: Backend,
    saved_stdin: Option<libc::termios>,
}

// SAFETY: the raw fds are used only through read/write syscalls, which are
// thread-safe.
unsafe impl Send for Console {}
unsafe impl Sync for Console {}

fn set_nonblocking(fd: RawFd) {
    // SAFETY: fcntl on a valid descriptor.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        let _ = libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
    }
}

/// Puts a terminal into raw (no echo, no canonical buffering) mode and
/// returns the saved attributes.
fn raw_mode(fd: RawFd) -> Option<libc::termios> {
    // SAFETY: termios calls on a descriptor we own; zeroed termios is a
    // valid out-param.
    unsafe {
        let mut saved: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut saved) != 0 {
            return None;
        }
        let mut raw = saved;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;
        let _ = libc::tcsetattr(fd, libc::TCSAFLUSH, &raw);
        Some(saved)
    }
}

impl Console {
    /// Opens the console.
    ///
    /// With `use_pty`, allocates a pseudo-terminal and logs the slave path;
    /// if that fails (or `use_pty` is false) the UART is wired to stdio,
    /// with stdin switched to raw non-blocking mode.
    pub fn new(use_pty: bool) -> Self {
        if use_pty {
            let mut master: RawFd = -1;
            let mut slave: RawFd = -1;
            // SAFETY: openpty with null name/termios/winsize out-params.
            let ok = unsafe {
                libc::openpty(
                    &mut master,
                    &mut slave,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                )
            } == 0;
            if ok {
                set_nonblocking(master);
                let _ = raw_mode(master);
                // SAFETY: ptsname on a master we just opened; the returned
                // pointer is valid until the next ptsname call.
                let slave_name = unsafe {
                    let p = libc::ptsname(master);
                    if p.is_null() {
                        String::new()
                    } else {
                        std::ffi::CStr::from_ptr(p).to_string_lossy().into_owned()
                    }
                };
                tracing::info!(pty = %slave_name, "UART attached to pseudo-terminal");
                return Self {
                    backend: Backend::Pty { master },
                    saved_stdin: None,
                };
            }
            tracing::warn!("could not open a PTY, falling back to stdio");
        }

        set_nonblocking(0);
        let saved_stdin = raw_mode(0);
        Self {
            backend: Backend::Stdio,
            saved_stdin,
        }
    }

    /// Writes transmitted UART bytes to the console.
    pub fn write_bytes(&self, bytes: &[u8]) {
        match self.backend {
            Backend::Stdio => {
                let mut out = io::stdout().lock();
                let _ = out.write_all(bytes);
                let _ = out.flush();
            }
            Backend::Pty { master } => {
                let mut rest = bytes;
                while !rest.is_empty() {
                    // SAFETY: write to an open descriptor from a live slice.
                    let n = unsafe {
                        libc::write(master, rest.as_ptr().cast(), rest.len())
                    };
                    if n <= 0 {
                        break;
                    }
                    rest = &rest[n as usize..];
                }
            }
        }
    }

    /// Non-blocking read of one input byte, if any is waiting.
    pub fn read_byte(&self) -> Option<u8> {
        let fd = match self.backend {
            Backend::Stdio => 0,
            Backend::Pty { master } => master,
        };
        let mut byte = 0u8;
        // SAFETY: one-byte read into a stack buffer.
        let n = unsafe { libc::read(fd, (&mut byte as *mut u8).cast(), 1) };
        if n == 1 { Some(byte) } else { None }
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        if let Some(ref saved) = self.saved_stdin {
            // SAFETY: restoring attributes previously read from stdin.
            unsafe {
                let _ = libc::tcsetattr(0, libc::TCSANOW, saved);
            }
        }
        if let Backend::Pty { master } = self.backend {
            // SAFETY: closing a descriptor we own.
            unsafe {
                let _ = libc::close(master);
            }
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.backend {
            Backend::Stdio => write!(f, "Console(stdio)"),
            Backend::Pty { master } => write!(f, "Console(pty fd {})", master),
        }
    }
}
