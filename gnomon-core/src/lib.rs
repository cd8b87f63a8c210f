//! Board-agnostic peripheral I/O core for the watch firmware
//!
//! This crate contains everything that hands events between interrupt
//! handlers and tasks, without depending on a specific chip:
//!
//! - Signal bus and ISR-shared status cells
//! - Deferred interrupt gating queue
//! - Dual-mode timed wait over two countdown timers
//! - Display transport (blocking and bulk senders) and panel operations
//! - Backlight brightness ramp
//! - Interrupt dispatch, button debounce, console line capture
//! - Device configuration types

#![no_std]
#![deny(unsafe_code)]

pub mod backlight;
pub mod config;
pub mod console;
pub mod display;
pub mod interrupt;
pub mod isr;
pub mod signal;
pub mod status;
pub mod timing;

#[cfg(test)]
mod mock;
