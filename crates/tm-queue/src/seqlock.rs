use std::{
    cell::UnsafeCell,
    fmt,
    sync::atomic::{AtomicU64, Ordering, compiler_fence},
};

use crate::error::EmptyError;

/// A sequential lock: single writer, any number of readers, no blocking on
/// the write side. Readers spin only across the narrow window in which a
/// write is in flight.
#[repr(C, align(64))]
pub struct Seqlock<T> {
    version: AtomicU64,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for Seqlock<T> {}
unsafe impl<T: Send> Sync for Seqlock<T> {}

impl<T: Copy> Seqlock<T> {
    #[inline]
    pub const fn new(val: T) -> Seqlock<T> {
        Seqlock { version: AtomicU64::new(0), data: UnsafeCell::new(val) }
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn was_ever_written(&self) -> bool {
        self.version() > 1
    }

    /// Spins until a complete (non-torn) value is visible. Only ever blocks
    /// across the brief odd-version window a concurrent `write` creates.
    #[inline(never)]
    pub fn read(&self, result: &mut T) -> Result<(), EmptyError> {
        loop {
            let v1 = self.version.load(Ordering::Acquire);
            if v1 < 2 {
                return Err(EmptyError::Empty);
            }
            compiler_fence(Ordering::AcqRel);
            unsafe {
                *result = *self.data.get();
            }
            compiler_fence(Ordering::AcqRel);
            let v2 = self.version.load(Ordering::Acquire);
            if v1 == v2 && v1 & 1 == 0 {
                return Ok(());
            }
            #[cfg(target_arch = "x86_64")]
            unsafe {
                std::arch::x86_64::_mm_pause()
            };
            #[cfg(not(target_arch = "x86_64"))]
            std::hint::spin_loop();
        }
    }

    #[inline(never)]
    pub fn write(&self, data: &T) {
        let v = self.version.fetch_add(1, Ordering::Release);
        compiler_fence(Ordering::AcqRel);
        unsafe { *self.data.get() = *data };
        compiler_fence(Ordering::AcqRel);
        self.version.store(v.wrapping_add(2), Ordering::Release);
    }
}

impl<T: Default> Default for Seqlock<T> {
    #[inline]
    fn default() -> Seqlock<T> {
        Seqlock { version: AtomicU64::new(0), data: UnsafeCell::new(T::default()) }
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Seqlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seqlock {{ data: {:?} }}", unsafe { *self.data.get() })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    #[test]
    fn lock_size() {
        assert_eq!(std::mem::size_of::<Seqlock<[u8; 48]>>(), 64);
        assert_eq!(std::mem::size_of::<Seqlock<[u8; 61]>>(), 128);
    }

    #[test]
    fn unwritten_is_empty() {
        let lock = Seqlock::new([0u8; 4]);
        let mut out = [1u8; 4];
        assert_eq!(lock.read(&mut out), Err(EmptyError::Empty));
    }

    #[test]
    fn write_then_read() {
        let lock = Seqlock::new([0u8; 4]);
        lock.write(&[1, 2, 3, 4]);
        let mut out = [0u8; 4];
        lock.read(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    fn read_write_race<const N: usize>() {
        let lock = Seqlock::new([0usize; N]);
        let done = AtomicBool::new(false);
        std::thread::scope(|s| {
            s.spawn(|| {
                let mut msg = [0usize; N];
                while !done.load(Ordering::Relaxed) {
                    if lock.read(&mut msg).is_ok() {
                        let first = msg[0];
                        for v in msg {
                            assert_eq!(first, v);
                        }
                    }
                }
            });
            s.spawn(|| {
                let start = std::time::Instant::now();
                let mut count = 0usize;
                let mut msg = [0usize; N];
                while start.elapsed() < std::time::Duration::from_millis(200) {
                    msg.fill(count);
                    lock.write(&msg);
                    count = count.wrapping_add(1);
                }
                done.store(true, Ordering::Relaxed);
            });
        });
    }

    #[test]
    fn race_16() {
        read_write_race::<16>();
    }

    #[test]
    fn race_128() {
        read_write_race::<128>();
    }
}
