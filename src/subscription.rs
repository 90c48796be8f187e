//! Long-lived event sources.
//!
//! A [`Subscription`] wraps a [`SubscriptionSource`]: something that can
//! produce a stream of values for as long as the application asks for it.
//! `Application::subscriptions` is re-evaluated after every update, and the
//! [`SubscriptionManager`] diffs the returned list by [`SubscriptionId`]:
//! sources that appear are started, sources that disappear are cancelled and
//! sources that stay keep running untouched.
//!
//! Identity is therefore the contract. Two subscriptions with the same id are
//! the same subscription, whatever closures they carry.

pub mod query;
pub mod terminal;
pub mod time;

use std::any::TypeId;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::command::Action;

/// Identity of a running subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    source: TypeId,
    hash: u64,
}

impl SubscriptionId {
    /// An id for source type `T` with a source-specific hash.
    #[must_use]
    pub fn of<T: 'static>(hash: u64) -> Self {
        Self {
            source: TypeId::of::<T>(),
            hash,
        }
    }

    /// Folds the type of a mapping function into the id, so the same source
    /// mapped into two different messages runs twice.
    fn mapped<F: 'static>(self) -> Self {
        let mut hasher = DefaultHasher::new();
        self.hash.hash(&mut hasher);
        TypeId::of::<F>().hash(&mut hasher);
        Self {
            source: self.source,
            hash: hasher.finish(),
        }
    }
}

/// A producer of values that can be turned into a [`Subscription`].
pub trait SubscriptionSource: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Starts a fresh stream. Called each time the subscription is (re)started.
    fn stream(&self) -> BoxStream<'static, Self::Output>;

    /// Identity used to diff subscriptions between updates.
    fn id(&self) -> SubscriptionId;
}

/// A type-erased subscription yielding application messages.
pub struct Subscription<Msg> {
    pub(crate) id: SubscriptionId,
    pub(crate) spawn: Box<dyn Fn() -> BoxStream<'static, Msg> + Send>,
}

impl<Msg: Send + 'static> Subscription<Msg> {
    pub fn new<S>(source: S) -> Self
    where
        S: SubscriptionSource<Output = Msg>,
    {
        Self {
            id: source.id(),
            spawn: Box::new(move || source.stream()),
        }
    }

    /// Maps every produced value into another message type.
    pub fn map<F, T>(self, f: F) -> Subscription<T>
    where
        F: Fn(Msg) -> T + Clone + Send + Sync + 'static,
        T: Send + 'static,
    {
        let spawn = self.spawn;
        Subscription {
            id: self.id.mapped::<F>(),
            spawn: Box::new(move || spawn().map(f.clone()).boxed()),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// A running subscription task.
pub struct Handle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Handle {
    /// Stops the task. Values already queued in the channel are not recalled.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Starts and stops subscriptions as the application's list changes.
pub struct SubscriptionManager<Msg> {
    running: HashMap<SubscriptionId, Handle>,
    tx: mpsc::UnboundedSender<Action<Msg>>,
}

impl<Msg: Send + 'static> SubscriptionManager<Msg> {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<Action<Msg>>) -> Self {
        Self {
            running: HashMap::new(),
            tx,
        }
    }

    /// Reconciles running tasks with `subscriptions`.
    pub fn update(&mut self, subscriptions: Vec<Subscription<Msg>>) {
        let mut wanted = HashMap::with_capacity(subscriptions.len());
        for sub in subscriptions {
            wanted.entry(sub.id).or_insert(sub);
        }

        self.running.retain(|id, handle| {
            let keep = wanted.contains_key(id);
            if !keep {
                trace!(?id, "cancelling subscription");
                handle.cancel();
            }
            keep
        });

        for (id, sub) in wanted {
            if self.running.contains_key(&id) {
                continue;
            }
            trace!(?id, "starting subscription");
            let handle = self.spawn(sub);
            self.running.insert(id, handle);
        }
    }

    fn spawn(&self, sub: Subscription<Msg>) -> Handle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.tx.clone();
        let mut stream = (sub.spawn)();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    next = stream.next() => match next {
                        Some(msg) => {
                            if tx.send(Action::Message(msg)).is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        Handle { token, join }
    }

    /// Number of subscriptions currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.running.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Cancels everything.
    pub fn shutdown(&mut self) {
        for (_, handle) in self.running.drain() {
            handle.cancel();
        }
    }
}

impl<Msg> Drop for SubscriptionManager<Msg> {
    fn drop(&mut self) {
        for handle in self.running.values() {
            handle.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tokio::time::{Duration, timeout};

    struct Numbers(Vec<u32>);

    impl SubscriptionSource for Numbers {
        type Output = u32;

        fn stream(&self) -> BoxStream<'static, u32> {
            stream::iter(self.0.clone()).boxed()
        }

        fn id(&self) -> SubscriptionId {
            let mut hasher = DefaultHasher::new();
            self.0.hash(&mut hasher);
            SubscriptionId::of::<Self>(hasher.finish())
        }
    }

    struct Forever;

    impl SubscriptionSource for Forever {
        type Output = ();

        fn stream(&self) -> BoxStream<'static, ()> {
            stream::pending().boxed()
        }

        fn id(&self) -> SubscriptionId {
            SubscriptionId::of::<Self>(0)
        }
    }

    #[test]
    fn test_id_depends_on_source_type() {
        assert_ne!(SubscriptionId::of::<Numbers>(1), SubscriptionId::of::<Forever>(1));
        assert_eq!(SubscriptionId::of::<Numbers>(1), SubscriptionId::of::<Numbers>(1));
    }

    #[test]
    fn test_map_changes_id_per_function_type() {
        let plain = Subscription::new(Numbers(vec![1])).id();
        let doubled = Subscription::new(Numbers(vec![1])).map(|n| n * 2).id();
        let tripled = Subscription::new(Numbers(vec![1])).map(|n| n * 3).id();
        assert_ne!(plain, doubled);
        assert_ne!(doubled, tripled);
    }

    #[tokio::test]
    async fn test_manager_forwards_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = SubscriptionManager::new(tx);

        manager.update(vec![Subscription::new(Numbers(vec![4, 5])).map(|n| n + 1)]);

        let mut got = vec![];
        for _ in 0..2 {
            match timeout(Duration::from_millis(200), rx.recv()).await {
                Ok(Some(Action::Message(n))) => got.push(n),
                _ => panic!("expected a message"),
            }
        }
        assert_eq!(got, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_manager_diffs_by_id() {
        let (tx, _rx) = mpsc::unbounded_channel::<Action<()>>();
        let mut manager = SubscriptionManager::new(tx);

        manager.update(vec![Subscription::new(Forever), Subscription::new(Forever)]);
        assert_eq!(manager.len(), 1, "duplicate ids collapse into one task");

        manager.update(vec![]);
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_task() {
        let (tx, _rx) = mpsc::unbounded_channel::<Action<()>>();
        let manager = SubscriptionManager::new(tx);
        let handle = manager.spawn(Subscription::new(Forever));

        handle.cancel();
        let finished = timeout(Duration::from_millis(200), async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(finished.is_ok());
    }
}
