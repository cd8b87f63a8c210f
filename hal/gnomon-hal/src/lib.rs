//! Gnomon Hardware Abstraction Layer
//!
//! This crate defines the register-level seams the watch core drives. The
//! core never touches a peripheral directly; it arms, polls and tears down
//! hardware through these traits so the same logic runs against the
//! STM32F4 implementation and against recording fakes on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  gnomon-core / gnomon-firmware          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  gnomon-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  gnomon-hal-  │
//!             │    stm32f4    │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Display control lines (D/C, chip select)
//! - [`spi::SpiChannel`] - Transmit side of a serial channel, register level
//! - [`dma::BulkEngine`] - Memory-to-peripheral bulk transfer engine
//! - [`timer::CountdownTimer`] - One-shot countdown timers
//! - [`pwm::PwmChannel`] - Backlight brightness output
//! - [`irq::InterruptGate`] - Per-line interrupt enable/disable

#![no_std]
#![deny(unsafe_code)]

pub mod dma;
pub mod gpio;
pub mod irq;
pub mod pwm;
pub mod spi;
pub mod timer;

// Re-export key traits at crate root for convenience
pub use dma::{BulkEngine, EngineStatus};
pub use gpio::{Level, OutputPin};
pub use irq::{InterruptGate, IrqLine};
pub use pwm::PwmChannel;
pub use spi::SpiChannel;
pub use timer::CountdownTimer;
