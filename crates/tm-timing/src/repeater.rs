use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::{Duration, Instant};

/// Fires at most once per `interval`. Used to gate periodic work (reconnect
/// attempts, visualization coalescing) without a dedicated timer thread.
#[derive(Clone, Copy, Debug)]
pub struct Repeater {
    interval: Duration,
    last_acted: Instant,
}

impl Repeater {
    #[inline]
    pub fn every(interval: Duration) -> Self {
        Self { interval, last_acted: Instant::now() }
    }

    #[inline]
    pub fn maybe<F>(&mut self, mut f: F)
    where
        F: FnMut(Duration),
    {
        let el = self.last_acted.elapsed();
        if el >= self.interval {
            f(el);
            self.last_acted = Instant::now();
        }
    }

    #[inline]
    pub fn fired(&mut self) -> bool {
        let el = self.last_acted.elapsed();
        if el >= self.interval {
            self.last_acted = Instant::now();
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[inline]
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn reset(&mut self) {
        self.last_acted = Instant::now();
    }

    /// Force the next `fired`/`maybe` call to trigger regardless of interval.
    pub fn force_fire(&mut self) {
        self.last_acted = self.last_acted - self.interval - Duration::from_secs(1);
    }
}

impl Add<Duration> for Repeater {
    type Output = Repeater;

    fn add(self, rhs: Duration) -> Self::Output {
        Repeater { interval: self.interval.saturating_add(rhs), ..self }
    }
}

impl Sub<Duration> for Repeater {
    type Output = Repeater;

    fn sub(self, rhs: Duration) -> Self::Output {
        Repeater { interval: self.interval.saturating_sub(rhs), ..self }
    }
}

impl AddAssign<Duration> for Repeater {
    fn add_assign(&mut self, rhs: Duration) {
        self.interval = self.interval.saturating_add(rhs);
    }
}

impl SubAssign<Duration> for Repeater {
    fn sub_assign(&mut self, rhs: Duration) {
        self.interval = self.interval.saturating_sub(rhs);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fires_after_interval() {
        let mut r = Repeater::every(Duration::from_millis(1));
        r.force_fire();
        assert!(r.fired());
        assert!(!r.fired());
    }

    #[test]
    fn set_interval_takes_effect() {
        let mut r = Repeater::every(Duration::from_secs(1000));
        assert!(!r.fired());
        r.set_interval(Duration::ZERO);
        assert!(r.fired());
    }
}
