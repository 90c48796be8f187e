//! Periodic ticks.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_stream::wrappers::IntervalStream;

use super::{SubscriptionId, SubscriptionSource};

/// Emits the tick instant every `period`, starting one period after start.
///
/// Missed ticks are skipped rather than replayed; a slow frame must not
/// cause a burst of housekeeping work afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Every {
    period: Duration,
}

impl Every {
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period }
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }
}

impl SubscriptionSource for Every {
    type Output = Instant;

    fn stream(&self) -> BoxStream<'static, Instant> {
        let mut ticks = interval_at(Instant::now() + self.period, self.period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        IntervalStream::new(ticks).boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}
