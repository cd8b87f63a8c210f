//! Embassy async tasks
//!
//! Tasks wait on the core signal bus; interrupt handlers only post to it.

pub mod backlight;
pub mod console;
pub mod deferred;
pub mod display;
pub mod input;

use embassy_stm32::gpio::Output;
use embassy_stm32::peripherals::TIM3;
use gnomon_core::backlight::Backlight;
use gnomon_core::display::Panel;
use gnomon_core::timing::DelayTimer;
use gnomon_hal_stm32f4::{CoarseTimer, DmaStream, FineTimer, Pin, SpiRegs, TimerPwm};

pub use backlight::backlight_task;
pub use console::console_task;
pub use deferred::deferred_task;
pub use display::display_task;
pub use input::input_task;

/// Round panel on SPI2 with DMA1 stream 4
pub type DisplayPanel =
    Panel<'static, SpiRegs, DmaStream, Pin<Output<'static>>, Pin<Output<'static>>>;

/// Millisecond sleeps on TIM2
pub type CoarseDelay = DelayTimer<'static, CoarseTimer>;

/// Microsecond sleeps on TIM4
pub type FineDelay = DelayTimer<'static, FineTimer>;

/// Backlight on TIM3 channel 1
pub type BacklightDriver = Backlight<TimerPwm<'static, TIM3>>;
