//! Segment publication fan-out.
//!
//! A plain `tokio::sync::mpsc` channel does not fit spec §5's backpressure
//! rule: `Sender::try_send` returning `Full` gives the *publisher* no way to
//! evict the *receiver's* own queued item, and only the receiving end can
//! drain its own queue. Each subscription is instead a small fixed-capacity
//! ring guarded by a `parking_lot::Mutex`, paired with a `tokio::sync::Notify`
//! for wakeups; publishing pops the oldest entry once a ring is full before
//! pushing the new one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Queue depth per subscriber before the oldest pending segment is dropped.
const SUBSCRIBER_CAPACITY: usize = 4;

struct SubscriptionInner {
    queue: Mutex<VecDeque<Bytes>>,
    notify: Notify,
    closed: AtomicBool,
}

/// The receiving end returned by [`crate::Fmp4Stream::subscribe`].
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    /// Waits for the next published segment, or returns `None` once the
    /// stream has shut down and no segments remain queued.
    pub async fn recv(&self) -> Option<Bytes> {
        loop {
            // `enable()` registers this future as a waiter immediately, before
            // the queue is checked, so a `notify_waiters()` landing between
            // the check and the `.await` below is not lost (tokio::sync::
            // Notify's documented pattern for this exact race).
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut queue = self.inner.queue.lock();
                if let Some(item) = queue.pop_front() {
                    return Some(item);
                }
                if self.inner.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            notified.await;
        }
    }
}

/// Owns the set of live subscriptions and fans segment bytes out to all of
/// them. Held exclusively by the driver task.
#[derive(Default)]
pub struct Broadcaster {
    subscribers: Vec<Arc<SubscriptionInner>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        let inner = Arc::new(SubscriptionInner {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        });
        self.subscribers.push(inner.clone());
        Subscription { inner }
    }

    /// Pushes `bytes` to every live subscriber, dropping each one's oldest
    /// pending item first if it is at capacity.
    pub fn publish(&mut self, bytes: Bytes) {
        self.subscribers
            .retain(|sub| !sub.closed.load(Ordering::Acquire));
        for sub in &self.subscribers {
            {
                let mut queue = sub.queue.lock();
                if queue.len() >= SUBSCRIBER_CAPACITY {
                    queue.pop_front();
                }
                queue.push_back(bytes.clone());
            }
            sub.notify.notify_waiters();
        }
    }

    /// Marks every subscription closed and wakes any pending receivers;
    /// already-queued segments are still delivered before `recv()` returns
    /// `None`.
    pub fn close_all(&mut self) {
        for sub in &self.subscribers {
            sub.closed.store(true, Ordering::Release);
            sub.notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_segments_in_order() {
        let mut broadcaster = Broadcaster::new();
        let sub = broadcaster.subscribe();
        broadcaster.publish(Bytes::from_static(b"one"));
        broadcaster.publish(Bytes::from_static(b"two"));

        assert_eq!(sub.recv().await, Some(Bytes::from_static(b"one")));
        assert_eq!(sub.recv().await, Some(Bytes::from_static(b"two")));
    }

    #[tokio::test]
    async fn slow_subscriber_drops_oldest_pending_segment() {
        let mut broadcaster = Broadcaster::new();
        let sub = broadcaster.subscribe();
        for i in 0..(SUBSCRIBER_CAPACITY + 2) {
            broadcaster.publish(Bytes::from(vec![i as u8]));
        }

        let first = sub.recv().await.unwrap();
        assert_eq!(first, Bytes::from(vec![2u8]));
    }

    #[tokio::test]
    async fn close_all_drains_queue_then_returns_none() {
        let mut broadcaster = Broadcaster::new();
        let sub = broadcaster.subscribe();
        broadcaster.publish(Bytes::from_static(b"last"));
        broadcaster.close_all();

        assert_eq!(sub.recv().await, Some(Bytes::from_static(b"last")));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn new_subscribers_do_not_see_segments_published_before_they_subscribed() {
        let mut broadcaster = Broadcaster::new();
        broadcaster.publish(Bytes::from_static(b"before"));
        let sub = broadcaster.subscribe();
        broadcaster.publish(Bytes::from_static(b"after"));

        assert_eq!(sub.recv().await, Some(Bytes::from_static(b"after")));
    }
}
