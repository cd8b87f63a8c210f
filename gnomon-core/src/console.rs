//! Console line capture
//!
//! The serial receive interrupt pushes bytes one at a time. A carriage
//! return or line feed publishes the line, upper-cased, for the console task
//! to take. Until it is taken, further bytes are rejected.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

/// Default console line capacity, bytes
pub const CONSOLE_LINE_LEN: usize = 32;

/// What happened to a pushed byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PushOutcome {
    /// Appended to the line
    Stored,
    /// Terminator; a line is ready to take
    LineReady,
    /// Line full; the byte was dropped and the line marked overflowed
    Overflow,
    /// A published line has not been taken yet; the byte was dropped
    Rejected,
    /// Blank line terminator or control byte
    Ignored,
}

/// A completed console line
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Line<const N: usize> {
    bytes: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> Line<N> {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The line as text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.bytes).ok()
    }

    /// Whether bytes were dropped because the line was too long
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }
}

#[derive(Debug)]
struct LineState<const N: usize> {
    buf: Vec<u8, N>,
    overflowed: bool,
    ready: bool,
}

/// Interrupt-fed line accumulator
pub struct ConsoleBuffer<const N: usize = CONSOLE_LINE_LEN> {
    state: Mutex<CriticalSectionRawMutex, RefCell<LineState<N>>>,
}

impl<const N: usize> ConsoleBuffer<N> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(LineState {
                buf: Vec::new(),
                overflowed: false,
                ready: false,
            })),
        }
    }

    /// Feed one received byte
    pub fn push(&self, byte: u8) -> PushOutcome {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if state.ready {
                return PushOutcome::Rejected;
            }
            match byte {
                b'\r' | b'\n' => {
                    if state.buf.is_empty() && !state.overflowed {
                        PushOutcome::Ignored
                    } else {
                        state.ready = true;
                        PushOutcome::LineReady
                    }
                }
                b if b.is_ascii_control() => PushOutcome::Ignored,
                b => {
                    if state.buf.push(b.to_ascii_uppercase()).is_ok() {
                        PushOutcome::Stored
                    } else {
                        state.overflowed = true;
                        PushOutcome::Overflow
                    }
                }
            }
        })
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock(|cell| cell.borrow().ready)
    }

    /// Take the published line, making room for the next one
    pub fn take_line(&self) -> Option<Line<N>> {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if !state.ready {
                return None;
            }
            let line = Line {
                bytes: core::mem::take(&mut state.buf),
                overflowed: state.overflowed,
            };
            state.overflowed = false;
            state.ready = false;
            Some(line)
        })
    }
}

impl<const N: usize> Default for ConsoleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
