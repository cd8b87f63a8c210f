//! STM32F4-specific HAL for the Gnomon watch firmware
//!
//! Register-level implementations of the `gnomon-hal` traits for the
//! STM32F411:
//!
//! - [`spi::SpiRegs`] - display SPI status and control bits
//! - [`dma::DmaStream`] - memory-to-SPI bulk engine on the embassy DMA driver
//! - [`timer::CoarseTimer`] / [`timer::FineTimer`] - one-pulse timers
//! - [`pwm::TimerPwm`] - backlight PWM
//! - [`gpio::Pin`] - control lines, plus EXTI source setup
//! - [`irq::NvicGate`] - interrupt masking for the deferred queue
//!
//! Peripheral bring-up (clocks, pin modes, baud rates) stays with
//! `embassy-stm32`; these types only take over the bits the core polls
//! and flips from interrupt context.
//!
//! # Features
//!
//! - `stm32f411ce` - Enable support for the STM32F411CE
//! - `defmt` - Enable debug formatting support

#![no_std]

pub mod dma;
pub mod gpio;
pub mod irq;
pub mod pwm;
pub mod spi;
pub mod timer;

pub use dma::DmaStream;
pub use gpio::Pin;
pub use irq::NvicGate;
pub use pwm::TimerPwm;
pub use spi::SpiRegs;
pub use timer::{CoarseTimer, FineTimer};
