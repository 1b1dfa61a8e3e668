use rand::Rng;
use tm_timing::{Duration, Repeater};

const INITIAL: Duration = Duration::from_millis(250);
const FACTOR: u32 = 2;
const CAP: Duration = Duration::from_secs(8);
const JITTER_FRACTION: f64 = 0.10;

/// Exponential-backoff reconnect gate built on a `Repeater` whose interval
/// is mutated between attempts, rather than a fixed one.
pub struct ReconnectBackoff {
    repeater: Repeater,
    current: Duration,
    attempts: u64,
    attempt_limit: Option<u64>,
}

impl ReconnectBackoff {
    pub fn new(attempt_limit: Option<u64>) -> Self {
        let mut repeater = Repeater::every(INITIAL);
        repeater.force_fire();
        Self { repeater, current: INITIAL, attempts: 0, attempt_limit }
    }

    /// True once the current interval has elapsed and a reconnect attempt
    /// should be made (and the attempt limit, if any, hasn't been reached).
    /// Used by the post-connect supervisor loop, which polls rather than
    /// blocking a thread on `sleep`.
    pub fn ready(&mut self) -> bool {
        if self.exhausted() {
            return false;
        }
        self.repeater.fired()
    }

    pub fn exhausted(&self) -> bool {
        matches!(self.attempt_limit, Some(limit) if self.attempts >= limit)
    }

    /// Call after a failed attempt: advances the counter, grows the
    /// interval (capped, jittered) for the *next* attempt, and returns the
    /// delay that should have preceded *this* attempt. The caller that
    /// blocks on `connect()` sleeps for the returned value.
    pub fn record_failure(&mut self) -> Duration {
        self.attempts += 1;
        let delay = jittered(self.current);
        let grown = self.current * FACTOR;
        self.current = if grown.as_nanos() > CAP.as_nanos() { CAP } else { grown };
        self.repeater.set_interval(self.current);
        delay
    }

    /// Call after a success: resets the interval and attempt counter.
    pub fn record_success(&mut self) {
        self.attempts = 0;
        self.current = INITIAL;
        self.repeater.set_interval(INITIAL);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }
}

fn jittered(base: Duration) -> Duration {
    let spread = (base.as_nanos() as f64 * JITTER_FRACTION) as i64;
    if spread == 0 {
        return base;
    }
    let delta = rand::rng().random_range(-spread..=spread);
    Duration::from_nanos((base.as_nanos() as i64 + delta).max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_and_caps() {
        let mut backoff = ReconnectBackoff::new(None);
        assert!(backoff.ready());
        backoff.record_failure();
        assert!(backoff.current.as_nanos() >= Duration::from_millis(400).as_nanos());
        for _ in 0..10 {
            backoff.record_failure();
        }
        assert!(backoff.current.as_nanos() <= CAP.as_nanos());
    }

    #[test]
    fn first_delay_matches_initial_interval() {
        let mut backoff = ReconnectBackoff::new(None);
        let delay = backoff.record_failure();
        // within jitter of the 250ms initial interval
        assert!(delay.as_nanos() >= Duration::from_millis(225).as_nanos());
        assert!(delay.as_nanos() <= Duration::from_millis(275).as_nanos());
    }

    #[test]
    fn resets_on_success() {
        let mut backoff = ReconnectBackoff::new(None);
        backoff.record_failure();
        backoff.record_failure();
        backoff.record_success();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.current, INITIAL);
    }

    #[test]
    fn respects_attempt_limit() {
        let mut backoff = ReconnectBackoff::new(Some(2));
        backoff.record_failure();
        backoff.record_failure();
        assert!(backoff.exhausted());
        assert!(!backoff.ready());
    }
}
