//! Lock-Free Interrupt-to-Foreground Sample Queue
#![allow(unsafe_code)] // Required for lock-free atomic operations
//!
//! ## Overview
//!
//! The sensor driver completes a conversion in interrupt context, while
//! storage and the radio run in the foreground loop. `SpscQueue` is the
//! bounded single-producer single-consumer ring between the two:
//!
//! ```text
//! Producer (ISR)                    Consumer (main loop)
//!      ↓                                   ↓
//!   push() ─────→  Ring Buffer  ─────→  pop()
//!      ↓                                   ↓
//!   Never Blocks                      Never Blocks
//! ```
//!
//! A full queue rejects the new sample instead of overwriting the oldest
//! one; the producer decides what to do with it.
//!
//! ## Algorithm
//!
//! ```text
//! ┌─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┐
//! │  0  │  1  │  2  │  3  │  4  │  5  │  6  │  7  │
//! └─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┘
//!          ↑                       ↑
//!        tail                    head
//!        (next read)          (next write)
//! ```
//!
//! Only the producer stores `head` and only the consumer stores `tail`.
//! One slot always stays empty so that `head == tail` means empty, hence
//! `N - 1` usable slots.
//!
//! ### Push
//! 1. Load own `head` (Relaxed), other side's `tail` (Acquire)
//! 2. Full if `head + 1 == tail`
//! 3. Write the slot, then publish `head + 1` with Release
//!
//! ### Pop
//! 1. Load own `tail` (Relaxed), other side's `head` (Acquire)
//! 2. Empty if `tail == head`
//! 3. Read the slot, then publish `tail + 1` with Release
//!
//! The Release/Acquire pair on `head` makes the slot write visible before
//! the consumer can see the new head; the pair on `tail` keeps the producer
//! from reusing a slot the consumer is still reading.
//!
//! ## Ownership
//!
//! [`SpscQueue::split`] hands out exactly one [`Producer`] and one
//! [`Consumer`] borrowing the queue, so the single-producer single-consumer
//! contract is enforced by the borrow checker rather than by convention.
//!
//! ```rust
//! use sensnet_core::queue::SpscQueue;
//!
//! let mut queue: SpscQueue<u16, 8> = SpscQueue::new();
//! let (mut producer, mut consumer) = queue.split();
//!
//! assert!(producer.push(7));
//! assert_eq!(consumer.pop(), Some(7));
//! assert_eq!(consumer.pop(), None);
//! ```

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Default queue capacity (slots, one stays empty)
pub const QUEUE_CAPACITY: usize = 16;

/// Bounded lock-free SPSC ring
pub struct SpscQueue<T: Copy, const N: usize = QUEUE_CAPACITY> {
    buffer: UnsafeCell<[MaybeUninit<T>; N]>,

    /// Next write position (producer owned)
    head: AtomicUsize,

    /// Next read position (consumer owned)
    tail: AtomicUsize,

    stats: QueueStats,
}

/// Queue counters
///
/// Relaxed updates; they never take part in synchronization.
#[derive(Debug)]
pub struct QueueStats {
    /// Values accepted by `push`
    pub pushed: AtomicU32,
    /// Values returned by `pop`
    pub popped: AtomicU32,
    /// Values rejected because the queue was full
    pub dropped: AtomicU32,
    /// Highest fill level observed by the producer
    pub max_depth: AtomicU32,
}

impl QueueStats {
    const fn new() -> Self {
        Self {
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_depth: AtomicU32::new(0),
        }
    }

    fn update_max_depth(&self, current: u32) {
        let mut max = self.max_depth.load(Ordering::Relaxed);
        while current > max {
            match self.max_depth.compare_exchange_weak(
                max,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }
}

impl<T: Copy, const N: usize> SpscQueue<T, N> {
    const CAPACITY_IS_POWER_OF_TWO: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "Queue capacity must be a power of 2 and at least 2"
    );

    /// Empty queue, usable in a `static`
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_IS_POWER_OF_TWO;

        Self {
            // SAFETY: an array of `MaybeUninit` needs no initialization
            buffer: UnsafeCell::new(unsafe { MaybeUninit::uninit().assume_init() }),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            stats: QueueStats::new(),
        }
    }

    /// Hand out the producer and consumer ends
    pub fn split(&mut self) -> (Producer<'_, T, N>, Consumer<'_, T, N>) {
        let queue: &Self = self;
        (Producer { queue }, Consumer { queue })
    }

    /// Usable slots
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Values currently queued; a snapshot when both ends are live
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & (N - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    fn slot(&self, index: usize) -> *mut MaybeUninit<T> {
        // Pointer arithmetic on the raw array avoids creating a reference to
        // the whole buffer while the other side touches a different slot.
        self.buffer.get().cast::<MaybeUninit<T>>().wrapping_add(index)
    }
}

impl<T: Copy, const N: usize> Default for SpscQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// Values move between exactly one producer and one consumer thread.
unsafe impl<T: Copy + Send, const N: usize> Sync for SpscQueue<T, N> {}

/// Writing end of a [`SpscQueue`]
pub struct Producer<'a, T: Copy, const N: usize> {
    queue: &'a SpscQueue<T, N>,
}

impl<T: Copy, const N: usize> Producer<'_, T, N> {
    /// Enqueue `value`; false if the queue is full
    pub fn push(&mut self, value: T) -> bool {
        let queue = self.queue;
        let head = queue.head.load(Ordering::Relaxed);
        let next_head = (head + 1) & (N - 1);

        if next_head == queue.tail.load(Ordering::Acquire) {
            queue.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: slot `head` is outside [tail, head) so the consumer does
        // not read it until the Release store below publishes it.
        unsafe {
            queue.slot(head).write(MaybeUninit::new(value));
        }
        queue.head.store(next_head, Ordering::Release);

        queue.stats.pushed.fetch_add(1, Ordering::Relaxed);
        queue.stats.update_max_depth(queue.len() as u32);
        true
    }

    pub fn is_full(&self) -> bool {
        let head = self.queue.head.load(Ordering::Relaxed);
        ((head + 1) & (N - 1)) == self.queue.tail.load(Ordering::Acquire)
    }
}

/// Reading end of a [`SpscQueue`]
pub struct Consumer<'a, T: Copy, const N: usize> {
    queue: &'a SpscQueue<T, N>,
}

impl<'a, T: Copy, const N: usize> Consumer<'a, T, N> {
    /// Dequeue the oldest value, if any
    pub fn pop(&mut self) -> Option<T> {
        let queue = self.queue;
        let tail = queue.tail.load(Ordering::Relaxed);

        if tail == queue.head.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: the Acquire load above saw the producer's Release store for
        // this slot, and the producer will not touch it until `tail` moves.
        let value = unsafe { queue.slot(tail).read().assume_init() };
        queue.tail.store((tail + 1) & (N - 1), Ordering::Release);

        queue.stats.popped.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }

    /// Values ready to pop
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop until empty
    pub fn drain(&mut self) -> Drain<'_, 'a, T, N> {
        Drain { consumer: self }
    }
}

/// Iterator returned by [`Consumer::drain`]
pub struct Drain<'c, 'a, T: Copy, const N: usize> {
    consumer: &'c mut Consumer<'a, T, N>,
}

impl<T: Copy, const N: usize> Iterator for Drain<'_, '_, T, N> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.consumer.pop()
    }
}
