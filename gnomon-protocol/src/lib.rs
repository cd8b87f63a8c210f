//! Round TFT Controller Protocol
//!
//! This crate defines the byte-level protocol between the watch MCU and its
//! 240x240 round TFT controller (GC9A01 class). The controller is write-only
//! over a serial channel; a dedicated control line tells it whether the byte
//! on the wire is a command opcode or a parameter/pixel byte.
//!
//! # Protocol Overview
//!
//! One logical instruction is a sequence of typed segments:
//! ```text
//! ┌─────────────┬──────────────────┬─────────────┬────────────
//! │ CMD  0x2A   │ DAT  x0h x0l x1h │ CMD  0x2B   │ DAT  ...
//! │ D/C low     │ D/C high         │ D/C low     │ D/C high
//! └─────────────┴──────────────────┴─────────────┴────────────
//! ```
//!
//! Fixed sequences (power-up, display on/off, sleep) are stored as compact
//! code tables of `[kind, length, payload...]` records and decoded lazily.
//! Pixels are 16-bit RGB565, most significant byte first.

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod frame;
pub mod pixel;

pub use command::{
    opcode, Area, AreaWindow, ScanDirection, ScanFrame, PANEL_HEIGHT, PANEL_WIDTH,
};
pub use frame::{CodeTable, FrameError, Segment, SegmentKind, TransmissionFrame, MAX_SEGMENTS};
pub use pixel::Rgb565;
