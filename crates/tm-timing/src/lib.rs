mod duration;
mod instant;
mod nanos;
mod repeater;

pub use duration::Duration;
pub use instant::{Instant, WallClock};
pub use nanos::Nanos;
pub use repeater::Repeater;
