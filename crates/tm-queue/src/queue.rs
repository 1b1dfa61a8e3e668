use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::{
    error::{EmptyError, QueueFullError},
    seqlock::Seqlock,
};

/// Default capacity for a frame queue when the caller doesn't specify one.
pub const DEFAULT_CAPACITY: usize = 4096;

struct Inner<T> {
    slots: Box<[Seqlock<T>]>,
    mask: usize,
    /// Next slot the producer will write. Producer-owned; read by the
    /// consumer to know how much is available.
    head: AtomicUsize,
    /// Next slot the consumer has fully read. Consumer-owned; read by the
    /// producer to enforce the capacity bound.
    tail: AtomicUsize,
}

impl<T: Copy> Inner<T> {
    fn capacity(&self) -> usize {
        self.mask + 1
    }
}

/// A bounded, lock-free single-producer/single-consumer queue of raw frames.
///
/// Built on [`Seqlock`] slots the way a multi-consumer shared-memory queue
/// would be, but with an explicit `tail` cursor published by the single
/// consumer so the producer can observe genuine backpressure instead of
/// silently overwriting unread slots.
pub struct FrameQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Copy + Default> FrameQueue<T> {
    /// Builds a queue and splits it into its producer and consumer halves.
    /// `capacity` is rounded up to the next power of two.
    pub fn bounded(capacity: usize) -> (QueueProducer<T>, QueueConsumer<T>) {
        let capacity = capacity.next_power_of_two().max(2);
        let slots = (0..capacity).map(|_| Seqlock::new(T::default())).collect::<Vec<_>>();
        let inner = Arc::new(Inner {
            slots: slots.into_boxed_slice(),
            mask: capacity - 1,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        });
        (QueueProducer { inner: inner.clone() }, QueueConsumer { inner, pos: 0 })
    }
}

/// The single producer half. Must only ever be used from one thread.
pub struct QueueProducer<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Copy> QueueProducer<T> {
    /// Attempts to enqueue `item`. Returns [`QueueFullError::Full`] if the
    /// consumer hasn't kept up with `capacity` in-flight frames; the caller
    /// (the framer) is expected to retry, per the blocking-producer
    /// requirement on the frame reader.
    pub fn try_enqueue(&self, item: &T) -> Result<(), QueueFullError> {
        let head = self.inner.head.load(Ordering::Relaxed);
        let tail = self.inner.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) >= self.inner.capacity() {
            return Err(QueueFullError::Full);
        }
        let idx = head & self.inner.mask;
        self.inner.slots[idx].write(item);
        self.inner.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Approximate count of frames not yet consumed. Racy by nature (the
    /// consumer may be mid-update); useful only for metrics/logging.
    pub fn len(&self) -> usize {
        let head = self.inner.head.load(Ordering::Relaxed);
        let tail = self.inner.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The single consumer half. Must only ever be used from one thread.
pub struct QueueConsumer<T> {
    inner: Arc<Inner<T>>,
    pos: usize,
}

impl<T: Copy> QueueConsumer<T> {
    /// Attempts to dequeue the next frame. Returns [`EmptyError::Empty`] if
    /// the producer hasn't published anything new.
    pub fn try_dequeue(&mut self, out: &mut T) -> Result<(), EmptyError> {
        let head = self.inner.head.load(Ordering::Acquire);
        if self.pos == head {
            return Err(EmptyError::Empty);
        }
        let idx = self.pos & self.inner.mask;
        self.inner.slots[idx].read(out)?;
        self.pos = self.pos.wrapping_add(1);
        self.inner.tail.store(self.pos, Ordering::Release);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.inner.head.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic_round_trip() {
        let (p, mut c) = FrameQueue::<u64>::bounded(16);
        let mut out = 0u64;
        assert_eq!(c.try_dequeue(&mut out), Err(EmptyError::Empty));

        for i in 0..16u64 {
            p.try_enqueue(&i).unwrap();
        }
        for i in 0..16u64 {
            c.try_dequeue(&mut out).unwrap();
            assert_eq!(out, i);
        }
        assert_eq!(c.try_dequeue(&mut out), Err(EmptyError::Empty));
    }

    #[test]
    fn reports_full_instead_of_overwriting() {
        let (p, mut c) = FrameQueue::<u64>::bounded(4);
        for i in 0..4u64 {
            p.try_enqueue(&i).unwrap();
        }
        assert_eq!(p.try_enqueue(&99), Err(QueueFullError::Full));

        let mut out = 0;
        c.try_dequeue(&mut out).unwrap();
        assert_eq!(out, 0);
        p.try_enqueue(&99).unwrap();
    }

    #[test]
    fn rounds_capacity_to_power_of_two() {
        let (p, _c) = FrameQueue::<u8>::bounded(5);
        assert_eq!(p.capacity(), 8);
    }

    #[test]
    fn multithreaded_spsc() {
        const N: u64 = 200_000;
        let (p, mut c) = FrameQueue::<u64>::bounded(1024);

        let producer = std::thread::spawn(move || {
            let mut i = 0u64;
            while i < N {
                if p.try_enqueue(&i).is_ok() {
                    i += 1;
                } else {
                    std::thread::yield_now();
                }
            }
        });

        let mut received = 0u64;
        let mut out = 0u64;
        while received < N {
            if c.try_dequeue(&mut out).is_ok() {
                assert_eq!(out, received);
                received += 1;
            } else {
                std::thread::yield_now();
            }
        }
        producer.join().unwrap();
    }
}
