//! Interrupt handlers
//!
//! Each handler clears its hardware cause and hands the event to
//! [`IsrDispatch`](gnomon_core::isr::IsrDispatch). A handler that fires
//! before dispatch is installed only quiets its source.

use embassy_stm32::interrupt;
use embassy_stm32::pac;
use embassy_stm32::pac::Interrupt;
use gnomon_core::isr::{Button, InputSource};
use gnomon_core::timing::TimerId;
use gnomon_hal::{BulkEngine, CountdownTimer};
use gnomon_hal_stm32f4::{gpio, irq, CoarseTimer, DmaStream, FineTimer, NvicGate, SpiRegs};

use crate::shared::{now_ms, CONSOLE, DISPATCH};

fn timer_update<T: CountdownTimer>(id: TimerId, mut timer: T) {
    match DISPATCH.try_get() {
        Some(dispatch) => dispatch.timer_expired(id, &mut timer),
        None => {
            timer.acknowledge();
            timer.stop();
        }
    }
}

fn button_edge(exti: usize, irq: Interrupt, button: Button) {
    gpio::clear_pending(exti);
    if let Some(dispatch) = DISPATCH.try_get() {
        let _ = dispatch.button_pressed(button, irq::line(irq), now_ms(), &mut NvicGate);
    }
}

fn input_edge(exti: usize, source: InputSource) {
    gpio::clear_pending(exti);
    if let Some(dispatch) = DISPATCH.try_get() {
        dispatch.input(source);
    }
}

#[interrupt]
fn TIM2() {
    timer_update(TimerId::Coarse, CoarseTimer::isr());
}

#[interrupt]
fn TIM4() {
    timer_update(TimerId::Fine, FineTimer::isr());
}

/// Display DMA completion, run from the embassy DMA1 stream 4 handler
pub fn display_dma_complete() {
    let mut spi = SpiRegs::spi2();
    let mut engine = DmaStream::isr();
    match DISPATCH.try_get() {
        Some(dispatch) => {
            let _ = dispatch.transfer_complete(&mut spi, &mut engine);
        }
        None => {
            let _ = engine.finish();
        }
    }
}

#[interrupt]
fn EXTI0() {
    button_edge(0, Interrupt::EXTI0, Button::Middle);
}

#[interrupt]
fn EXTI1() {
    button_edge(1, Interrupt::EXTI1, Button::Left);
}

#[interrupt]
fn EXTI2() {
    button_edge(2, Interrupt::EXTI2, Button::Right);
}

#[interrupt]
fn EXTI3() {
    input_edge(3, InputSource::Touch);
}

#[interrupt]
fn EXTI4() {
    input_edge(4, InputSource::ImuInt1);
}

#[interrupt]
fn USART2() {
    let uart = pac::USART2;
    let sr = uart.sr().read();
    if !(sr.rxne() || sr.ore()) {
        return;
    }
    // DR read after SR clears both RXNE and ORE
    let byte = uart.dr().read().dr() as u8;
    if let Some(dispatch) = DISPATCH.try_get() {
        let _ = dispatch.console_byte(byte, &CONSOLE);
    }
}
