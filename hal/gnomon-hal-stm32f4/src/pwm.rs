//! Backlight PWM on a general-purpose timer channel

use embassy_stm32::timer::simple_pwm::SimplePwm;
use embassy_stm32::timer::{Channel, GeneralInstance4Channel};
use gnomon_hal::PwmChannel;

/// One channel of an embassy `SimplePwm`
pub struct TimerPwm<'d, T: GeneralInstance4Channel> {
    pwm: SimplePwm<'d, T>,
    channel: Channel,
}

impl<'d, T: GeneralInstance4Channel> TimerPwm<'d, T> {
    pub fn new(pwm: SimplePwm<'d, T>, channel: Channel) -> Self {
        Self { pwm, channel }
    }
}

impl<T: GeneralInstance4Channel> PwmChannel for TimerPwm<'_, T> {
    fn enable(&mut self) {
        self.pwm.channel(self.channel).enable();
    }

    fn set_duty(&mut self, duty: u16) {
        let max = self.max_duty();
        self.pwm.channel(self.channel).set_duty_cycle(duty.min(max));
    }

    fn max_duty(&self) -> u16 {
        self.pwm.max_duty_cycle()
    }
}
