//! Thread-safe FIFO storage with blocking and non-blocking operations.
//!
//! Two interchangeable strategies behind one type, selected at
//! construction: an unbounded queue (linked storage guarded by a mutex and
//! a "non-empty" condition) and a fixed-capacity circular buffer. The ring
//! allocates `capacity + 1` physical slots and leaves one permanently
//! unused so that full and empty states stay distinguishable without a
//! separate counter: empty is `head == tail`, full is
//! `(tail + 1) % slots == head`.
//!
//! Blocking `push`/`pop` wait on "not full"/"not empty" conditions,
//! optionally with a timeout. `try_push`/`try_pop` never wait and fail
//! immediately on full/empty. A mailbox is this primitive configured
//! unbounded; the worker pool's job queue is the same primitive drained by
//! blocking `pop`.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Fixed-capacity ring buffer. One slot is intentionally never occupied.
struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.resize_with(capacity + 1, || None);
        Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    fn is_full(&self) -> bool {
        (self.tail + 1) % self.slots.len() == self.head
    }

    fn len(&self) -> usize {
        (self.tail + self.slots.len() - self.head) % self.slots.len()
    }

    fn push_back(&mut self, item: T) {
        debug_assert!(!self.is_full());
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.slots.len();
    }

    fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        item
    }

    fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
    }
}

enum Storage<T> {
    Unbounded(VecDeque<T>),
    Ring(Ring<T>),
}

impl<T> Storage<T> {
    fn is_empty(&self) -> bool {
        match self {
            Storage::Unbounded(q) => q.is_empty(),
            Storage::Ring(r) => r.is_empty(),
        }
    }

    fn is_full(&self) -> bool {
        match self {
            Storage::Unbounded(_) => false,
            Storage::Ring(r) => r.is_full(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Storage::Unbounded(q) => q.len(),
            Storage::Ring(r) => r.len(),
        }
    }

    fn push_back(&mut self, item: T) {
        match self {
            Storage::Unbounded(q) => q.push_back(item),
            Storage::Ring(r) => r.push_back(item),
        }
    }

    fn pop_front(&mut self) -> Option<T> {
        match self {
            Storage::Unbounded(q) => q.pop_front(),
            Storage::Ring(r) => r.pop_front(),
        }
    }

    fn clear(&mut self) {
        match self {
            Storage::Unbounded(q) => q.clear(),
            Storage::Ring(r) => r.clear(),
        }
    }
}

/// Thread-safe FIFO queue, bounded or unbounded.
pub struct Queue<T> {
    storage: Mutex<Storage<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl<T> Queue<T> {
    /// Create an unbounded queue. `push` variants never fail or wait.
    pub fn unbounded() -> Self {
        Self {
            storage: Mutex::new(Storage::Unbounded(VecDeque::new())),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: None,
        }
    }

    /// Create a queue holding at most `capacity` items. A capacity of zero
    /// falls back to unbounded.
    pub fn bounded(capacity: usize) -> Self {
        if capacity == 0 {
            return Self::unbounded();
        }
        Self {
            storage: Mutex::new(Storage::Ring(Ring::new(capacity))),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: Some(capacity),
        }
    }

    /// Maximum number of items, or `None` for unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.storage.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.lock().is_empty()
    }

    /// Append without waiting. Returns the item back when the queue is full.
    pub fn try_push(&self, item: T) -> std::result::Result<(), T> {
        let mut storage = self.storage.lock();
        if storage.is_full() {
            return Err(item);
        }
        storage.push_back(item);
        drop(storage);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Append, waiting for space if the queue is full.
    pub fn push(&self, item: T) {
        let mut storage = self.storage.lock();
        while storage.is_full() {
            self.not_full.wait(&mut storage);
        }
        storage.push_back(item);
        drop(storage);
        self.not_empty.notify_one();
    }

    /// Append, waiting at most `timeout` for space. Returns the item back
    /// when the queue is still full at the deadline.
    pub fn push_timeout(&self, item: T, timeout: Duration) -> std::result::Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut storage = self.storage.lock();
        while storage.is_full() {
            if self.not_full.wait_until(&mut storage, deadline).timed_out() {
                if storage.is_full() {
                    return Err(item);
                }
                break;
            }
        }
        storage.push_back(item);
        drop(storage);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the front item without waiting.
    pub fn try_pop(&self) -> Option<T> {
        let mut storage = self.storage.lock();
        let item = storage.pop_front();
        drop(storage);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Remove the front item, waiting until one is available.
    pub fn pop(&self) -> T {
        let mut storage = self.storage.lock();
        loop {
            if let Some(item) = storage.pop_front() {
                drop(storage);
                self.not_full.notify_one();
                return item;
            }
            self.not_empty.wait(&mut storage);
        }
    }

    /// Remove the front item, waiting at most `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut storage = self.storage.lock();
        loop {
            if let Some(item) = storage.pop_front() {
                drop(storage);
                self.not_full.notify_one();
                return Some(item);
            }
            if self.not_empty.wait_until(&mut storage, deadline).timed_out() {
                let item = storage.pop_front();
                drop(storage);
                if item.is_some() {
                    self.not_full.notify_one();
                }
                return item;
            }
        }
    }

    /// Drop all queued items.
    pub fn clear(&self) {
        let mut storage = self.storage.lock();
        storage.clear();
        drop(storage);
        self.not_full.notify_all();
    }
}

impl<T> std::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn ring_capacity_is_exact() {
        let queue = Queue::bounded(4);
        for i in 0..4 {
            assert!(queue.try_push(i).is_ok(), "push {} should fit", i);
        }
        assert_eq!(queue.try_push(4), Err(4));
        assert_eq!(queue.len(), 4);

        assert_eq!(queue.try_pop(), Some(0));
        assert!(queue.try_push(4).is_ok());
        assert_eq!(queue.try_push(5), Err(5));
    }

    #[test]
    fn fifo_order_preserved_across_wrap() {
        let queue = Queue::bounded(3);
        for round in 0..5u32 {
            let base = round * 10;
            queue.try_push(base).unwrap();
            queue.try_push(base + 1).unwrap();
            assert_eq!(queue.try_pop(), Some(base));
            assert_eq!(queue.try_pop(), Some(base + 1));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn unbounded_never_rejects() {
        let queue = Queue::unbounded();
        for i in 0..10_000 {
            assert!(queue.try_push(i).is_ok());
        }
        assert_eq!(queue.len(), 10_000);
        assert_eq!(queue.try_pop(), Some(0));
    }

    #[test]
    fn zero_capacity_means_unbounded() {
        let queue = Queue::bounded(0);
        assert_eq!(queue.capacity(), None);
        for i in 0..100 {
            assert!(queue.try_push(i).is_ok());
        }
    }

    #[test]
    fn try_pop_on_empty_returns_none() {
        let queue: Queue<u32> = Queue::bounded(2);
        assert_eq!(queue.try_pop(), None);
        queue.try_push(1).unwrap();
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn clear_discards_and_frees_slots() {
        let queue = Queue::bounded(2);
        queue.try_push(1).unwrap();
        queue.try_push(2).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.try_push(3).is_ok());
        assert_eq!(queue.try_pop(), Some(3));
    }

    #[test]
    fn pop_timeout_expires_on_empty() {
        let queue: Queue<u32> = Queue::unbounded();
        let started = Instant::now();
        assert_eq!(queue.pop_timeout(Duration::from_millis(50)), None);
        assert!(started.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn push_timeout_expires_on_full() {
        let queue = Queue::bounded(1);
        queue.try_push(1).unwrap();
        assert_eq!(queue.push_timeout(2, Duration::from_millis(50)), Err(2));
    }

    #[test]
    fn blocking_pop_wakes_on_push() {
        let queue: Arc<Queue<u32>> = Arc::new(Queue::unbounded());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.push(42);
        assert_eq!(consumer.join().unwrap(), 42);
    }

    #[test]
    fn blocking_push_wakes_on_pop() {
        let queue: Arc<Queue<u32>> = Arc::new(Queue::bounded(1));
        queue.try_push(1).unwrap();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.try_pop(), Some(1));
        producer.join().unwrap();
        assert_eq!(queue.try_pop(), Some(2));
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue: Arc<Queue<u64>> = Arc::new(Queue::unbounded());
        let producers: Vec<_> = (0..4u64)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..1000 {
                        queue.push(p * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }
        let mut seen = Vec::new();
        while let Some(v) = queue.try_pop() {
            seen.push(v);
        }
        seen.sort_unstable();
        let expected: Vec<u64> = (0..4u64).flat_map(|p| (0..1000).map(move |i| p * 1000 + i)).collect();
        assert_eq!(seen, expected);
    }

    proptest! {
        // The bounded queue must behave exactly like a capacity-checked
        // VecDeque under any interleaving of try ops.
        #[test]
        fn bounded_matches_model(ops in proptest::collection::vec(any::<Option<u8>>(), 0..200)) {
            let queue = Queue::bounded(4);
            let mut model: VecDeque<u8> = VecDeque::new();
            for op in ops {
                match op {
                    Some(v) => {
                        let accepted = queue.try_push(v).is_ok();
                        prop_assert_eq!(accepted, model.len() < 4);
                        if accepted {
                            model.push_back(v);
                        }
                    }
                    None => {
                        prop_assert_eq!(queue.try_pop(), model.pop_front());
                    }
                }
                prop_assert_eq!(queue.len(), model.len());
            }
        }
    }
}
