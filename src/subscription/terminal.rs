//! Keyboard and resize events from crossterm.

use std::io;

use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use futures::stream::BoxStream;

use super::{SubscriptionId, SubscriptionSource};

/// Terminal input as a subscription.
///
/// Yields `Err` once if the event reader fails, then ends; the application
/// decides whether that is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerminalEvents;

impl TerminalEvents {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SubscriptionSource for TerminalEvents {
    type Output = Result<Event, io::Error>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        futures::stream::unfold(Some(EventStream::new()), |events| async move {
            let mut events = events?;
            match events.next().await? {
                Ok(event) => Some((Ok(event), Some(events))),
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }

    fn id(&self) -> SubscriptionId {
        // One reader per process; every instance is the same subscription.
        SubscriptionId::of::<Self>(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_instances_share_one_id() {
        assert_eq!(TerminalEvents::new().id(), TerminalEvents.id());
    }
}
