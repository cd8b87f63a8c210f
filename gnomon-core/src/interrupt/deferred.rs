//! Deferred interrupt gating
//!
//! Interrupt handlers that must mask their own line for a while (button
//! debounce, sensor bursts) queue the matching re-enable here instead of
//! waiting in interrupt context. A periodic task retires due entries.
//!
//! The queue is a fixed-capacity binary min-heap keyed on the deadline,
//! stored in an array (`left = 2i+1`, `right = 2i+2`, `parent = (i-1)/2`).
//! Equal deadlines retire in no particular order.
//!
//! Deadlines live on a wrapping `u32` clock (milliseconds since boot on the
//! watch, wrapping every ~49.7 days). Ordering and the due check compare
//! through [`precedes`], so every pending deadline and the `now` passed to
//! [`DeferredIrqQueue::retire_due`] must lie within `i32::MAX` ticks of each
//! other. Delays are debounce-sized and the queue is drained every few
//! milliseconds, which keeps that window many orders of magnitude wide.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use gnomon_hal::{InterruptGate, IrqLine};
use heapless::Vec;

/// Outstanding requests the queue holds
pub const DEFERRED_CAPACITY: usize = 10;

/// Minimum deadline reported by an empty queue
pub const NO_DEADLINE: u32 = u32::MAX;

/// Whether `a` is at or before `b` on the wrapping clock
#[inline]
pub const fn precedes(a: u32, b: u32) -> bool {
    (b.wrapping_sub(a) as i32) >= 0
}

/// Gating action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GateOp {
    Enable,
    Disable,
}

/// One pending enable/disable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeferredRequest {
    pub op: GateOp,
    pub line: IrqLine,
    /// Retire once the logical clock reaches this value
    pub deadline: u32,
}

impl DeferredRequest {
    /// Perform the gating action
    pub fn apply<G: InterruptGate>(&self, gate: &mut G) {
        match self.op {
            GateOp::Enable => gate.enable(self.line),
            GateOp::Disable => gate.disable(self.line),
        }
    }
}

/// Bounded min-heap of deferred requests
#[derive(Debug, Clone, Default)]
pub struct DeferredIrqQueue<const N: usize = DEFERRED_CAPACITY> {
    heap: Vec<DeferredRequest, N>,
}

impl<const N: usize> DeferredIrqQueue<N> {
    pub const fn new() -> Self {
        Self { heap: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.is_full()
    }

    /// Queue `op` on `line` for `deadline`
    ///
    /// Returns `false` when full; the queue is left untouched and nothing is
    /// gated.
    #[must_use]
    pub fn schedule(&mut self, line: IrqLine, op: GateOp, deadline: u32) -> bool {
        if self
            .heap
            .push(DeferredRequest { op, line, deadline })
            .is_err()
        {
            return false;
        }
        self.sift_up(self.heap.len() - 1);
        debug_assert!(self.is_heap());
        true
    }

    /// Queue a re-enable `delay` ticks after `now`
    #[must_use]
    pub fn enable_after(&mut self, line: IrqLine, now: u32, delay: u32) -> bool {
        self.schedule(line, GateOp::Enable, now.wrapping_add(delay))
    }

    /// Queue a mask `delay` ticks after `now`
    #[must_use]
    pub fn disable_after(&mut self, line: IrqLine, now: u32, delay: u32) -> bool {
        self.schedule(line, GateOp::Disable, now.wrapping_add(delay))
    }

    /// Earliest pending deadline, or [`NO_DEADLINE`]
    ///
    /// The sentinel only means "empty"; a queued deadline may also equal it.
    pub fn peek_min_deadline(&self) -> u32 {
        self.heap.first().map_or(NO_DEADLINE, |r| r.deadline)
    }

    /// Earliest pending request
    pub fn peek(&self) -> Option<&DeferredRequest> {
        self.heap.first()
    }

    /// Remove the earliest request; `None` on an empty queue
    pub fn pop(&mut self) -> Option<DeferredRequest> {
        if self.heap.is_empty() {
            return None;
        }
        let min = self.heap.swap_remove(0);
        self.sift_down(0);
        debug_assert!(self.is_heap());
        Some(min)
    }

    /// Apply every request whose deadline is at or before `now`
    ///
    /// Requests are applied in deadline order. Returns how many were retired.
    pub fn retire_due<G: InterruptGate>(&mut self, now: u32, gate: &mut G) -> usize {
        let mut retired = 0;
        while self.heap.first().is_some_and(|r| precedes(r.deadline, now)) {
            if let Some(request) = self.pop() {
                request.apply(gate);
                retired += 1;
            }
        }
        retired
    }

    fn sift_up(&mut self, mut child: usize) {
        while child > 0 {
            let parent = (child - 1) / 2;
            if precedes(self.heap[parent].deadline, self.heap[child].deadline) {
                break;
            }
            self.heap.swap(parent, child);
            child = parent;
        }
    }

    fn sift_down(&mut self, mut parent: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * parent + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smaller = if right < len
                && !precedes(self.heap[left].deadline, self.heap[right].deadline)
            {
                right
            } else {
                left
            };
            if precedes(self.heap[parent].deadline, self.heap[smaller].deadline) {
                break;
            }
            self.heap.swap(parent, smaller);
            parent = smaller;
        }
    }

    fn is_heap(&self) -> bool {
        (1..self.heap.len()).all(|i| precedes(self.heap[(i - 1) / 2].deadline, self.heap[i].deadline))
    }
}

/// [`DeferredIrqQueue`] behind a critical-section mutex
///
/// Interrupt handlers schedule while the drain task retires. Both sides pass
/// the same wrapping millisecond clock; deadlines scheduled just before it
/// wraps come due just after, as long as the drain task keeps running.
pub struct SharedDeferredQueue<const N: usize = DEFERRED_CAPACITY> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<DeferredIrqQueue<N>>>,
}

impl<const N: usize> Default for SharedDeferredQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SharedDeferredQueue<N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(DeferredIrqQueue::new())),
        }
    }

    #[must_use]
    pub fn schedule(&self, line: IrqLine, op: GateOp, deadline: u32) -> bool {
        self.inner
            .lock(|q| q.borrow_mut().schedule(line, op, deadline))
    }

    /// Retire due requests inside one critical section
    pub fn retire_due<G: InterruptGate>(&self, now: u32, gate: &mut G) -> usize {
        self.inner.lock(|q| q.borrow_mut().retire_due(now, gate))
    }

    pub fn peek_min_deadline(&self) -> u32 {
        self.inner.lock(|q| q.borrow().peek_min_deadline())
    }

    pub fn len(&self) -> usize {
        self.inner.lock(|q| q.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use proptest::prelude::*;
    use std::vec::Vec as StdVec;

    /// Records every gating call
    #[derive(Default)]
    struct RecordingGate {
        calls: StdVec<(GateOp, IrqLine)>,
    }

    impl InterruptGate for RecordingGate {
        fn enable(&mut self, line: IrqLine) {
            self.calls.push((GateOp::Enable, line));
        }

        fn disable(&mut self, line: IrqLine) {
            self.calls.push((GateOp::Disable, line));
        }
    }

    #[test]
    fn test_retire_in_deadline_order() {
        let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
        let mut gate = RecordingGate::default();

        assert!(queue.schedule(IrqLine(50), GateOp::Enable, 50));
        assert!(queue.schedule(IrqLine(10), GateOp::Enable, 10));
        assert!(queue.schedule(IrqLine(30), GateOp::Disable, 30));

        assert_eq!(queue.retire_due(15, &mut gate), 1);
        assert_eq!(queue.retire_due(35, &mut gate), 1);
        assert_eq!(queue.retire_due(60, &mut gate), 1);

        assert_eq!(
            gate.calls,
            [
                (GateOp::Enable, IrqLine(10)),
                (GateOp::Disable, IrqLine(30)),
                (GateOp::Enable, IrqLine(50)),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_nothing_due_yet() {
        let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
        let mut gate = RecordingGate::default();

        assert!(queue.schedule(IrqLine(1), GateOp::Enable, 100));
        assert_eq!(queue.retire_due(99, &mut gate), 0);
        assert!(gate.calls.is_empty());
        // Deadline is inclusive
        assert_eq!(queue.retire_due(100, &mut gate), 1);
    }

    #[test]
    fn test_full_queue_rejects() {
        let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
        for i in 0..DEFERRED_CAPACITY as u32 {
            assert!(queue.schedule(IrqLine(i as u16), GateOp::Enable, 100 - i));
        }
        assert!(queue.is_full());

        let before = queue.clone();
        assert!(!queue.schedule(IrqLine(99), GateOp::Disable, 0));
        assert_eq!(queue.len(), DEFERRED_CAPACITY);
        assert_eq!(queue.heap, before.heap);
        assert!(queue.is_heap());
        assert_eq!(queue.peek_min_deadline(), 91);
    }

    #[test]
    fn test_peek_sentinel() {
        let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
        assert_eq!(queue.peek_min_deadline(), NO_DEADLINE);

        assert!(queue.schedule(IrqLine(3), GateOp::Enable, 42));
        assert_eq!(queue.peek_min_deadline(), 42);
        assert_eq!(queue.peek().map(|r| r.line), Some(IrqLine(3)));
    }

    #[test]
    fn test_pop_empty_is_noop() {
        let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
        assert_eq!(queue.pop(), None);
        assert!(queue.schedule(IrqLine(0), GateOp::Enable, 5));
        assert!(queue.pop().is_some());
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_retire_at_max_time_on_empty_queue() {
        let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
        let mut gate = RecordingGate::default();
        assert_eq!(queue.retire_due(u32::MAX, &mut gate), 0);
    }

    #[test]
    fn test_enable_after_wraps() {
        let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
        assert!(queue.enable_after(IrqLine(6), u32::MAX - 5, 50));
        assert!(queue.disable_after(IrqLine(7), u32::MAX - 30, 20));
        assert_eq!(
            queue.pop().map(|r| (r.op, r.deadline)),
            Some((GateOp::Disable, u32::MAX - 10))
        );
        assert_eq!(queue.pop().map(|r| r.deadline), Some(44));
    }

    #[test]
    fn test_retire_across_clock_wrap() {
        let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
        let mut gate = RecordingGate::default();

        assert!(queue.schedule(IrqLine(1), GateOp::Enable, 20));
        assert!(queue.schedule(IrqLine(2), GateOp::Enable, u32::MAX - 2));
        assert!(queue.schedule(IrqLine(3), GateOp::Enable, u32::MAX));
        assert_eq!(queue.peek_min_deadline(), u32::MAX - 2);

        assert_eq!(queue.retire_due(u32::MAX - 3, &mut gate), 0);
        assert_eq!(queue.retire_due(u32::MAX, &mut gate), 2);
        assert_eq!(queue.retire_due(5, &mut gate), 0);
        assert_eq!(queue.retire_due(20, &mut gate), 1);

        let lines: StdVec<_> = gate.calls.iter().map(|c| c.1).collect();
        assert_eq!(lines, [IrqLine(2), IrqLine(3), IrqLine(1)]);
    }

    #[test]
    fn test_precedes() {
        assert!(precedes(10, 10));
        assert!(precedes(10, 11));
        assert!(!precedes(11, 10));
        assert!(precedes(u32::MAX, 0));
        assert!(!precedes(0, u32::MAX));
    }

    #[test]
    fn test_shared_queue() {
        let queue: SharedDeferredQueue = SharedDeferredQueue::new();
        let mut gate = RecordingGate::default();

        assert!(queue.schedule(IrqLine(40), GateOp::Enable, 20));
        assert!(queue.schedule(IrqLine(23), GateOp::Enable, 10));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek_min_deadline(), 10);

        assert_eq!(queue.retire_due(25, &mut gate), 2);
        assert!(queue.is_empty());
        assert_eq!(gate.calls[0].1, IrqLine(23));
    }

    proptest! {
        #[test]
        fn prop_retires_in_nondecreasing_order(
            base in any::<u32>(),
            offsets in proptest::collection::vec(0..=i32::MAX as u32, 0..=DEFERRED_CAPACITY)
        ) {
            let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
            for (i, &offset) in offsets.iter().enumerate() {
                prop_assert!(queue.schedule(IrqLine(i as u16), GateOp::Enable, base.wrapping_add(offset)));
            }

            let mut last = 0u32;
            let mut popped = 0;
            while let Some(request) = queue.pop() {
                let offset = request.deadline.wrapping_sub(base);
                prop_assert!(offset >= last);
                last = offset;
                popped += 1;
            }
            prop_assert_eq!(popped, offsets.len());
            // Popping past the end changes nothing
            prop_assert_eq!(queue.pop(), None);
        }

        #[test]
        fn prop_interleaved_ops_track_sorted_model(
            ops in proptest::collection::vec(proptest::option::of(0u32..1000), 0..64)
        ) {
            let mut queue: DeferredIrqQueue = DeferredIrqQueue::new();
            let mut model: StdVec<u32> = StdVec::new();

            for op in ops {
                match op {
                    Some(deadline) => {
                        let accepted = queue.schedule(IrqLine(0), GateOp::Disable, deadline);
                        prop_assert_eq!(accepted, model.len() < DEFERRED_CAPACITY);
                        if accepted {
                            model.push(deadline);
                            model.sort_unstable();
                        }
                    }
                    None => {
                        let expected = (!model.is_empty()).then(|| model.remove(0));
                        prop_assert_eq!(queue.pop().map(|r| r.deadline), expected);
                    }
                }
                prop_assert!(queue.is_heap());
                prop_assert_eq!(queue.peek_min_deadline(), model.first().copied().unwrap_or(NO_DEADLINE));
            }
        }
    }
}
