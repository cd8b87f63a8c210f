//! Backlight brightness ramp
//!
//! Brightness moves geometrically: doubling on the way up, halving on the
//! way down, one coarse-timer sleep between register writes. A ramp from
//! level `L` to zero (or from zero to `L`) takes `⌈log2 L⌉ + 1` writes.

use gnomon_hal::{CountdownTimer, PwmChannel};

use crate::timing::{DelayTimer, SleepStatus};

/// Highest brightness register value (11 bits)
pub const MAX_BRIGHTNESS: u16 = 2047;

/// Brightness applied at power-up
pub const DEFAULT_BRIGHTNESS: u16 = 1024;

/// Pause between ramp steps, ms
pub const DEFAULT_STEP_MS: u32 = 50;

/// Ramp errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampError {
    /// The step timer was already counting; the ramp stopped where it was
    TimerBusy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampState {
    Idle(u16),
    Ramping {
        current: u16,
        target: u16,
        direction: RampDirection,
    },
}

/// Geometric ramp between two brightness levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BrightnessRamp {
    current: u16,
    target: u16,
}

impl BrightnessRamp {
    pub const fn new(level: u16) -> Self {
        let level = clamp_level(level);
        Self {
            current: level,
            target: level,
        }
    }

    pub fn current(&self) -> u16 {
        self.current
    }

    pub fn target(&self) -> u16 {
        self.target
    }

    /// Aim at a new level, clamped to [`MAX_BRIGHTNESS`]
    pub fn set_target(&mut self, target: u16) {
        self.target = clamp_level(target);
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Stop at the current level
    pub fn halt(&mut self) {
        self.target = self.current;
    }

    pub fn state(&self) -> RampState {
        match self.direction() {
            None => RampState::Idle(self.current),
            Some(direction) => RampState::Ramping {
                current: self.current,
                target: self.target,
                direction,
            },
        }
    }

    /// Advance one step, returning the new level to write
    ///
    /// Returns `None` once settled.
    pub fn step(&mut self) -> Option<u16> {
        let next = match self.direction()? {
            RampDirection::Up if self.current == 0 => 1,
            RampDirection::Up => self.current.saturating_mul(2).min(self.target),
            RampDirection::Down if self.current == 1 => 0,
            RampDirection::Down => ((self.current + 1) / 2).max(self.target),
        };
        debug_assert!(next <= MAX_BRIGHTNESS);
        self.current = next;
        Some(next)
    }

    fn direction(&self) -> Option<RampDirection> {
        match self.current.cmp(&self.target) {
            core::cmp::Ordering::Less => Some(RampDirection::Up),
            core::cmp::Ordering::Greater => Some(RampDirection::Down),
            core::cmp::Ordering::Equal => None,
        }
    }
}

impl Default for BrightnessRamp {
    fn default() -> Self {
        Self::new(DEFAULT_BRIGHTNESS)
    }
}

const fn clamp_level(level: u16) -> u16 {
    if level > MAX_BRIGHTNESS {
        MAX_BRIGHTNESS
    } else {
        level
    }
}

/// Scale a brightness level onto the channel's duty range
fn duty_for(level: u16, max_duty: u16) -> u16 {
    (level as u32 * max_duty as u32 / MAX_BRIGHTNESS as u32) as u16
}

/// Backlight PWM channel driven through a [`BrightnessRamp`]
pub struct Backlight<P> {
    pwm: P,
    ramp: BrightnessRamp,
    remembered: u16,
    step_ms: u32,
}

impl<P: PwmChannel> Backlight<P> {
    /// Enable the channel and apply `level` at once
    pub fn new(mut pwm: P, level: u16) -> Self {
        let ramp = BrightnessRamp::new(level);
        pwm.enable();
        pwm.set_duty(duty_for(ramp.current(), pwm.max_duty()));
        Self {
            pwm,
            ramp,
            remembered: if ramp.current() == 0 {
                DEFAULT_BRIGHTNESS
            } else {
                ramp.current()
            },
            step_ms: DEFAULT_STEP_MS,
        }
    }

    pub fn with_step_ms(mut self, step_ms: u32) -> Self {
        self.step_ms = step_ms;
        self
    }

    pub fn level(&self) -> u16 {
        self.ramp.current()
    }

    /// Level `on` returns to
    pub fn remembered(&self) -> u16 {
        self.remembered
    }

    pub fn state(&self) -> RampState {
        self.ramp.state()
    }

    /// Jump straight to `level`
    pub fn set_immediate(&mut self, level: u16) {
        self.ramp = BrightnessRamp::new(level);
        self.write(self.ramp.current());
    }

    /// Ramp to `target`, sleeping on the coarse timer between writes
    ///
    /// The sleep mode follows the scheduler state. No sleep follows the final
    /// write. If the timer is busy the ramp stops at the level reached.
    pub async fn ramp_to<T: CountdownTimer>(
        &mut self,
        target: u16,
        delay: &mut DelayTimer<'_, T>,
    ) -> Result<(), RampError> {
        self.ramp.set_target(target);

        while let Some(level) = self.ramp.step() {
            self.write(level);
            if self.ramp.is_settled() {
                break;
            }
            let mode = delay.wait_mode();
            if delay.sleep(self.step_ms, mode).await == SleepStatus::Busy {
                self.ramp.halt();
                #[cfg(feature = "defmt")]
                defmt::warn!("brightness ramp stopped at {}: timer busy", level);
                return Err(RampError::TimerBusy);
            }
        }
        Ok(())
    }

    /// Ramp up to the remembered level
    pub async fn on<T: CountdownTimer>(
        &mut self,
        delay: &mut DelayTimer<'_, T>,
    ) -> Result<(), RampError> {
        let level = self.remembered;
        self.ramp_to(level, delay).await
    }

    /// Ramp down to dark, remembering the current level
    pub async fn off<T: CountdownTimer>(
        &mut self,
        delay: &mut DelayTimer<'_, T>,
    ) -> Result<(), RampError> {
        if self.ramp.current() > 0 {
            self.remembered = self.ramp.current();
        }
        self.ramp_to(0, delay).await
    }

    fn write(&mut self, level: u16) {
        let duty = duty_for(level, self.pwm.max_duty());
        self.pwm.set_duty(duty);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::mock::{CoarseTimer, FakePwm, HwEvent, HwLog};
    use crate::status::{SystemStatus, WaitMode};
    use crate::timing::TimerId;
    use embassy_futures::block_on;
    use embassy_futures::select::{select, Either};
    use proptest::prelude::*;
    use std::vec::Vec;

    fn ceil_log2(level: u16) -> usize {
        (level as u32).next_power_of_two().trailing_zeros() as usize
    }

    fn run(ramp: &mut BrightnessRamp) -> Vec<u16> {
        core::iter::from_fn(|| ramp.step()).collect()
    }

    fn duties(log: &HwLog) -> Vec<u16> {
        log.events()
            .into_iter()
            .filter_map(|e| match e {
                HwEvent::Duty(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_step_rules() {
        let mut ramp = BrightnessRamp::new(0);
        ramp.set_target(10);
        assert_eq!(run(&mut ramp), [1, 2, 4, 8, 10]);

        ramp.set_target(0);
        assert_eq!(run(&mut ramp), [5, 3, 2, 1, 0]);
        assert_eq!(ramp.state(), RampState::Idle(0));
    }

    #[test]
    fn test_partial_ramp_down_stops_at_target() {
        let mut ramp = BrightnessRamp::new(1000);
        ramp.set_target(300);
        assert_eq!(run(&mut ramp), [500, 300]);
    }

    #[test]
    fn test_target_clamped() {
        let mut ramp = BrightnessRamp::new(5000);
        assert_eq!(ramp.current(), MAX_BRIGHTNESS);
        ramp.set_target(u16::MAX);
        assert!(ramp.is_settled());
    }

    #[test]
    fn test_state_reports_direction() {
        let mut ramp = BrightnessRamp::new(64);
        ramp.set_target(256);
        assert_eq!(
            ramp.state(),
            RampState::Ramping {
                current: 64,
                target: 256,
                direction: RampDirection::Up
            }
        );
        ramp.halt();
        assert_eq!(ramp.state(), RampState::Idle(64));
    }

    proptest! {
        #[test]
        fn prop_ramp_down_step_count(level in 1u16..=MAX_BRIGHTNESS) {
            let mut ramp = BrightnessRamp::new(level);
            ramp.set_target(0);
            let steps = run(&mut ramp);
            prop_assert_eq!(steps.len(), ceil_log2(level) + 1);
            prop_assert_eq!(steps.last().copied(), Some(0));
            prop_assert!(steps.windows(2).all(|w| w[1] < w[0]));
        }

        #[test]
        fn prop_ramp_up_step_count(level in 1u16..=MAX_BRIGHTNESS) {
            let mut ramp = BrightnessRamp::new(0);
            ramp.set_target(level);
            let steps = run(&mut ramp);
            prop_assert_eq!(steps.len(), ceil_log2(level) + 1);
            prop_assert_eq!(steps.last().copied(), Some(level));
            prop_assert!(steps.iter().all(|&s| s <= level));
        }
    }

    #[test]
    fn test_ramp_sleeps_between_writes() {
        let status = SystemStatus::new();
        let (task, isr) = status.split().unwrap();
        let log = HwLog::default();
        let mut delay = DelayTimer::new(
            TimerId::Coarse,
            CoarseTimer::expiring(&log, isr.coarse),
            task.coarse,
            task.signals,
            task.scheduler,
        );
        let mut backlight = Backlight::new(FakePwm::new(&log), 0);
        log.clear();

        block_on(backlight.ramp_to(16, &mut delay)).unwrap();

        assert_eq!(duties(&log), [1, 2, 4, 8, 16]);
        // 50 ms at 2048 Hz, once between each pair of writes
        assert_eq!(log.count(HwEvent::TimerStart(103)), 4);
        assert_eq!(log.events().last(), Some(&HwEvent::Duty(16)));
        assert_eq!(backlight.state(), RampState::Idle(16));
    }

    #[test]
    fn test_ramp_stops_when_timer_busy() {
        let status = SystemStatus::new();
        let (task, _isr) = status.split().unwrap();
        status.scheduler().mark_running();
        let log = HwLog::default();
        let mut delay = DelayTimer::new(
            TimerId::Coarse,
            CoarseTimer::silent(&log),
            task.coarse,
            task.signals,
            task.scheduler,
        );

        // Leave the timer counting
        let abandoned = block_on(select(
            delay.sleep(500, WaitMode::Cooperative),
            core::future::ready(()),
        ));
        assert!(matches!(abandoned, Either::Second(())));

        let mut backlight = Backlight::new(FakePwm::new(&log), 1024);
        log.clear();

        assert_eq!(
            block_on(backlight.ramp_to(0, &mut delay)),
            Err(RampError::TimerBusy)
        );
        assert_eq!(duties(&log), [512]);
        assert_eq!(backlight.state(), RampState::Idle(512));
    }

    #[test]
    fn test_off_then_on_restores_level() {
        let status = SystemStatus::new();
        let (task, isr) = status.split().unwrap();
        let log = HwLog::default();
        let mut delay = DelayTimer::new(
            TimerId::Coarse,
            CoarseTimer::expiring(&log, isr.coarse),
            task.coarse,
            task.signals,
            task.scheduler,
        );
        let mut backlight = Backlight::new(FakePwm::new(&log), 300).with_step_ms(10);

        block_on(backlight.off(&mut delay)).unwrap();
        assert_eq!(backlight.level(), 0);
        assert_eq!(backlight.remembered(), 300);

        block_on(backlight.on(&mut delay)).unwrap();
        assert_eq!(backlight.level(), 300);
    }

    #[test]
    fn test_set_immediate_and_duty_scaling() {
        let log = HwLog::default();
        let mut backlight = Backlight::new(FakePwm::new(&log), 9999);
        assert_eq!(log.events(), [HwEvent::PwmEnable, HwEvent::Duty(MAX_BRIGHTNESS)]);

        backlight.set_immediate(7);
        assert_eq!(backlight.level(), 7);
        assert_eq!(log.events().last(), Some(&HwEvent::Duty(7)));

        assert_eq!(duty_for(1024, 999), 499);
        assert_eq!(duty_for(MAX_BRIGHTNESS, 999), 999);
    }
}
