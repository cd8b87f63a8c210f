//! Bulk-transfer engine abstraction
//!
//! A bulk engine copies a memory buffer into a peripheral data register
//! without CPU involvement and raises a completion interrupt at the end.
//!
//! Where the interrupt vector belongs to a vendor DMA driver that reports
//! completion by waking a registered [`Waker`], [`hook_waker`] turns a plain
//! function into that waker.

use core::task::{RawWaker, RawWakerVTable, Waker};

/// Largest transfer a single arm can cover
pub const MAX_TRANSFER_LEN: usize = u16::MAX as usize;

/// Outcome reported by the engine when its completion flags are cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineStatus {
    /// The whole buffer was transferred
    Complete,
    /// The engine flagged a transfer error
    Error,
}

/// Memory-to-peripheral bulk transfer engine
pub trait BulkEngine {
    /// Arm the engine to stream `src` into the channel data register.
    ///
    /// `src.len()` must not exceed [`MAX_TRANSFER_LEN`].
    ///
    /// # Safety
    ///
    /// The engine reads `src` after this call returns. The caller must keep
    /// the buffer alive and unmodified until the completion interrupt has
    /// run [`BulkEngine::finish`].
    #[allow(unsafe_code)]
    unsafe fn start(&mut self, src: &[u8]);

    /// Clear the engine's completion and error flags and disable it.
    fn finish(&mut self) -> EngineStatus;
}

/// Completion callback run from the engine's interrupt
pub type CompletionHook = fn();

static HOOK_VTABLE: RawWakerVTable = RawWakerVTable::new(hook_clone, hook_wake, hook_wake, hook_drop);

/// A [`Waker`] that calls `hook` on every wake
///
/// Clones call the same hook, and dropping one is a no-op.
#[allow(unsafe_code)]
pub fn hook_waker(hook: CompletionHook) -> Waker {
    // SAFETY: the vtable only turns the data pointer back into the `fn()` it
    // was made from, and owns nothing
    unsafe { Waker::from_raw(RawWaker::new(hook as *const (), &HOOK_VTABLE)) }
}

#[allow(unsafe_code)]
unsafe fn hook_clone(data: *const ()) -> RawWaker {
    RawWaker::new(data, &HOOK_VTABLE)
}

#[allow(unsafe_code)]
unsafe fn hook_wake(data: *const ()) {
    // SAFETY: `data` came from a `CompletionHook` in `hook_waker`
    let hook = unsafe { core::mem::transmute::<*const (), CompletionHook>(data) };
    hook();
}

#[allow(unsafe_code)]
unsafe fn hook_drop(_: *const ()) {}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static FIRED: AtomicUsize = AtomicUsize::new(0);

    fn count() {
        FIRED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_hook_waker_runs_hook_on_each_wake() {
        let waker = hook_waker(count);
        waker.wake_by_ref();
        waker.wake_by_ref();

        let stored = waker.clone();
        assert!(stored.will_wake(&waker));
        drop(waker);
        stored.wake();

        assert_eq!(FIRED.load(Ordering::SeqCst), 3);
    }
}
