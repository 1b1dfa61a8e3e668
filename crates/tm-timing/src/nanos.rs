/// A raw nanosecond count with no epoch attached, used to carry small
/// cross-thread deltas (e.g. error-event timestamps) without the overhead
/// of a full `Instant`/`WallClock`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Nanos(pub u64);

impl Nanos {
    #[inline]
    pub fn now_monotonic() -> Self {
        use std::sync::OnceLock;
        static EPOCH: OnceLock<std::time::Instant> = OnceLock::new();
        let epoch = EPOCH.get_or_init(std::time::Instant::now);
        Self(epoch.elapsed().as_nanos() as u64)
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Nanos) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl From<Nanos> for crate::Duration {
    #[inline]
    fn from(value: Nanos) -> Self {
        crate::Duration(value.0)
    }
}
