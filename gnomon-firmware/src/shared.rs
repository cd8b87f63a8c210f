//! State shared between interrupt handlers and tasks
//!
//! The status cells, the deferred queue and the console buffer are owned by
//! the core; this module only gives them static homes. Task-level state the
//! interrupt handlers never touch sits behind an async mutex.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::once_lock::OnceLock;
use embassy_time::Instant;

use gnomon_core::backlight::{DEFAULT_BRIGHTNESS, MAX_BRIGHTNESS};
use gnomon_core::console::ConsoleBuffer;
use gnomon_core::interrupt::SharedDeferredQueue;
use gnomon_core::isr::IsrDispatch;
use gnomon_core::status::SystemStatus;

/// Brightness change per side-button press
pub const BRIGHTNESS_STEP: u16 = 256;

/// Signal bus, scheduler flag, channel and timer status
pub static SYSTEM: SystemStatus = SystemStatus::new();

/// Pending interrupt re-enables
pub static DEFERRED: SharedDeferredQueue = SharedDeferredQueue::new();

/// Console receive line
pub static CONSOLE: ConsoleBuffer = ConsoleBuffer::new();

/// Installed once in `main`, before any handled interrupt is unmasked
pub static DISPATCH: OnceLock<IsrDispatch<'static>> = OnceLock::new();

/// What the user asked the screen to do
pub static DISPLAY_STATE: Mutex<CriticalSectionRawMutex, DisplayState> =
    Mutex::new(DisplayState::new());

/// Requested screen power and backlight level
pub struct DisplayState {
    pub on: bool,
    pub brightness: u16,
}

impl DisplayState {
    pub const fn new() -> Self {
        Self {
            on: true,
            brightness: DEFAULT_BRIGHTNESS,
        }
    }

    /// Level the backlight should settle at
    pub fn backlight_target(&self) -> u16 {
        if self.on {
            self.brightness
        } else {
            0
        }
    }

    pub fn brighter(&mut self) {
        self.brightness = self
            .brightness
            .saturating_add(BRIGHTNESS_STEP)
            .min(MAX_BRIGHTNESS);
    }

    pub fn dimmer(&mut self) {
        // Never step all the way to dark; that is what the middle button is for
        self.brightness = self.brightness.saturating_sub(BRIGHTNESS_STEP).max(1);
    }
}

/// Milliseconds since boot, wrapping every ~49.7 days
///
/// Deferred deadlines are compared against it with
/// [`gnomon_core::interrupt::precedes`].
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}
