//! PWM output abstraction

/// Single PWM output channel
pub trait PwmChannel {
    /// Start driving the output
    fn enable(&mut self);

    /// Set the compare value, in the range `0..=max_duty()`
    fn set_duty(&mut self, duty: u16);

    /// Full-scale compare value
    fn max_duty(&self) -> u16;
}
