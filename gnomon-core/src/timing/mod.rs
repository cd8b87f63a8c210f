//! Timed waits

pub mod delay;

pub use delay::{duration_to_ticks, DelayTimer, SleepStatus, TimerId};
