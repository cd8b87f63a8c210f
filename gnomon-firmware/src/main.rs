//! Gnomon - Smartwatch Firmware
//!
//! Main firmware binary for STM32F411-based watch boards: a round SPI panel
//! with a PWM backlight, three buttons, and a serial console.
//!
//! Start-up runs with the scheduler stopped, so the panel init sequence and
//! the first backlight ramp spin on the hardware timers. Once the tasks are
//! spawned every wait goes through the signal bus instead.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::pac;
use embassy_stm32::pac::Interrupt;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::{khz, mhz};
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::timer::Channel;
use embassy_stm32::usart::{self, Uart};
use {defmt_rtt as _, panic_probe as _};

use gnomon_core::backlight::Backlight;
use gnomon_core::display::{DisplayTransport, Panel};
use gnomon_core::isr::IsrDispatch;
use gnomon_core::signal::Signals;
use gnomon_core::status::TaskSide;
use gnomon_core::timing::{DelayTimer, TimerId};
use gnomon_hal_stm32f4::gpio::{configure_falling_edge, Port};
use gnomon_hal_stm32f4::{CoarseTimer, DmaStream, FineTimer, Pin, SpiRegs, TimerPwm};

use crate::shared::{DEFERRED, DISPATCH, DISPLAY_STATE, SYSTEM};

mod config;
mod irq;
mod shared;
mod tasks;

/// Timer kernel clock with the reset clock tree (HSI, APB1 /1)
const TIMER_KERNEL_HZ: u32 = 16_000_000;

/// EXTI lines on port B: three buttons, touch, IMU
const EXTI_LINES: usize = 5;

/// Interrupts the core needs before the scheduler starts
///
/// The DMA stream vectors belong to `embassy-stm32`, which unmasks them in
/// `init`.
const STARTUP_IRQS: [Interrupt; 2] = [Interrupt::TIM2, Interrupt::TIM4];

/// Input interrupts, unmasked once the tasks can take their events
const INPUT_IRQS: [Interrupt; 6] = [
    Interrupt::EXTI0,
    Interrupt::EXTI1,
    Interrupt::EXTI2,
    Interrupt::EXTI3,
    Interrupt::EXTI4,
    Interrupt::USART2,
];

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Gnomon firmware starting...");

    let mut config = embassy_stm32::Config::default();
    config.dma_interrupt_priority = Priority::P2;
    let p = embassy_stm32::init(config);
    info!("Peripherals initialized");

    let device = config::load();
    info!("Configuration: {:?}", device);

    // Hand the ISR half to the dispatch layer before any handler can run
    let Some((task, isr)) = SYSTEM.split() else {
        defmt::panic!("System status already split");
    };
    let dispatch = IsrDispatch::new(isr, &DEFERRED).with_debounce(device.input.debounce_ms);
    if DISPATCH.init(dispatch).is_err() {
        defmt::panic!("Interrupt dispatch already installed");
    }

    let TaskSide {
        display: channel,
        coarse,
        fine,
        signals,
        scheduler,
    } = task;

    let mut coarse = DelayTimer::new(
        TimerId::Coarse,
        CoarseTimer::new(TIMER_KERNEL_HZ),
        coarse,
        signals,
        scheduler,
    );
    let fine = DelayTimer::new(
        TimerId::Fine,
        FineTimer::new(TIMER_KERNEL_HZ),
        fine,
        signals,
        scheduler,
    );

    // Display bus: SPI2 (PB13=SCK, PB15=MOSI), DC on PA8, CS on PB12
    let mut spi_config = spi::Config::default();
    spi_config.frequency = mhz(8);
    let bus = Spi::new_blocking_txonly(p.SPI2, p.PB13, p.PB15, spi_config);
    // Dropping the driver would disable the peripheral; the core drives it
    // through register handles from here on
    core::mem::forget(bus);

    let spi = SpiRegs::spi2();
    let engine = DmaStream::dma1_stream4_spi2(
        p.DMA1_CH4,
        spi.data_register(),
        irq::display_dma_complete,
    );

    let transport = DisplayTransport::new(spi, engine, channel, signals, scheduler)
        .with_bulk_threshold(device.display.bulk_threshold as usize);
    let dc = Pin(Output::new(p.PA8, Level::High, Speed::VeryHigh));
    let cs = Pin(Output::new(p.PB12, Level::High, Speed::VeryHigh));
    let mut panel =
        Panel::new(transport, dc, cs).with_size(device.display.width, device.display.height);

    enable_interrupts(&STARTUP_IRQS);

    if let Err(e) = panel.init(&mut coarse).await {
        error!("Panel init failed: {:?}", e);
    }

    // Backlight: TIM3 CH1 on PA6, 20 kHz
    let pwm = SimplePwm::new(
        p.TIM3,
        Some(PwmPin::new(p.PA6, OutputType::PushPull)),
        None,
        None,
        None,
        khz(20),
        CountingMode::EdgeAlignedUp,
    );
    let mut backlight = Backlight::new(TimerPwm::new(pwm, Channel::Ch1), 0)
        .with_step_ms(device.timing.ramp_step_ms);
    DISPLAY_STATE.lock().await.brightness = device.display.default_brightness;
    if let Err(e) = backlight
        .ramp_to(device.display.default_brightness, &mut coarse)
        .await
    {
        warn!("Start-up backlight ramp failed: {:?}", e);
    }
    info!("Display ready");

    // Buttons on PB0-PB2, touch on PB3, IMU INT1 on PB4; all active low
    let inputs = [
        Input::new(p.PB0, Pull::Up),
        Input::new(p.PB1, Pull::Up),
        Input::new(p.PB2, Pull::Up),
        Input::new(p.PB3, Pull::Up),
        Input::new(p.PB4, Pull::Up),
    ];
    // Keep the pin modes; only the EXTI lines are used from here on
    core::mem::forget(inputs);
    for line in 0..EXTI_LINES {
        configure_falling_edge(Port::B, line);
    }

    // Console: USART2 (PA2=TX, PA3=RX), receive interrupt per byte
    let mut uart_config = usart::Config::default();
    uart_config.baudrate = 115200;
    match Uart::new_blocking(p.USART2, p.PA3, p.PA2, uart_config) {
        Ok(uart) => {
            core::mem::forget(uart);
            pac::USART2.cr1().modify(|w| w.set_rxneie(true));
        }
        Err(e) => error!("Console UART init failed: {:?}", e),
    }

    enable_interrupts(&INPUT_IRQS);

    // From here on, waits suspend instead of spinning
    scheduler.mark_running();
    signals.post(Signals::SYSTEM_INITIALIZED);

    spawner.spawn(tasks::deferred_task(device.timing.deferred_poll_ms)).unwrap();
    spawner.spawn(tasks::display_task(panel, fine, signals)).unwrap();
    spawner
        .spawn(tasks::backlight_task(backlight, coarse, signals))
        .unwrap();
    spawner.spawn(tasks::input_task(signals)).unwrap();
    spawner.spawn(tasks::console_task(signals)).unwrap();

    info!("All tasks spawned");
}

fn enable_interrupts(irqs: &[Interrupt]) {
    for &irq in irqs {
        irq.set_priority(Priority::P2);
        // SAFETY: `irq` defines a handler for every line listed here, and
        // DISPATCH is installed before the first of them is unmasked
        unsafe { irq.enable() };
    }
}
