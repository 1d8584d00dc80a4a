//! Bounded, non-blocking fan-out queue.
//!
//! One publisher, any number of subscribers, each with its own cursor into a shared
//! ring of the most recent `capacity` values. Publishing never waits: when the ring
//! is full the oldest value is evicted under the same lock that inserts the new one.
//!
//! ```text
//!            evicted            retained (capacity)
//!   seq:  .. 3  4  5 │ 6  7  8  9 │ 10 (next)
//!                    ▲        ▲
//!          slow cursor        fast cursor
//! ```
//!
//! A subscriber whose cursor falls behind the oldest retained value skips ahead and
//! counts the gap in [`Subscriber::lagged`].

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{Result, TelemetryError};

/// Default number of retained values.
pub const DEFAULT_CAPACITY: usize = 32;

#[derive(Debug)]
struct State<T> {
    ring: VecDeque<T>,
    /// Sequence number the next published value will get.
    next_seq: u64,
    dropped: u64,
    /// Values published after `close()`.
    discarded: u64,
    closed: bool,
}

impl<T> State<T> {
    fn first_seq(&self) -> u64 {
        self.next_seq - self.ring.len() as u64
    }
}

#[derive(Debug)]
struct Shared<T> {
    state: Mutex<State<T>>,
    available: Condvar,
    #[cfg(feature = "async")]
    notify: tokio::sync::Notify,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wake_all(&self) {
        self.available.notify_all();
        #[cfg(feature = "async")]
        self.notify.notify_waiters();
    }
}

/// Publishing handle. Cloning yields another handle to the same channel.
#[derive(Debug)]
pub struct TelemetryChannel<T> {
    shared: Arc<Shared<T>>,
    capacity: usize,
}

impl<T> Clone for TelemetryChannel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            capacity: self.capacity,
        }
    }
}

impl<T: Clone> Default for TelemetryChannel<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T: Clone> TelemetryChannel<T> {
    /// Create a channel retaining at most `capacity` values (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    ring: VecDeque::with_capacity(capacity),
                    next_seq: 0,
                    dropped: 0,
                    discarded: 0,
                    closed: false,
                }),
                available: Condvar::new(),
                #[cfg(feature = "async")]
                notify: tokio::sync::Notify::new(),
            }),
            capacity,
        }
    }

    /// Append a value, evicting the oldest when full. Returns its sequence number.
    ///
    /// Never blocks beyond the brief internal lock and never fails. After
    /// [`close`](Self::close) the value is discarded, counted in
    /// [`discarded_count`](Self::discarded_count), and `None` is returned.
    pub fn publish(&self, value: T) -> Option<u64> {
        let seq = {
            let mut state = self.shared.lock();
            if state.closed {
                state.discarded += 1;
                trace!(discarded = state.discarded, "publish after close ignored");
                return None;
            }
            if state.ring.len() == self.capacity {
                state.ring.pop_front();
                state.dropped += 1;
                trace!(dropped = state.dropped, "evicted oldest telemetry value");
            }
            state.ring.push_back(value);
            let seq = state.next_seq;
            state.next_seq += 1;
            seq
        };
        self.shared.wake_all();
        Some(seq)
    }

    /// A new cursor positioned at the oldest retained value.
    pub fn subscribe(&self) -> Subscriber<T> {
        let cursor = self.shared.lock().first_seq();
        Subscriber {
            shared: Arc::clone(&self.shared),
            cursor,
            lagged: 0,
        }
    }

    /// Most recently published value.
    pub fn latest(&self) -> Option<T> {
        self.shared.lock().ring.back().cloned()
    }

    /// Stop accepting values and wake every waiting subscriber.
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.wake_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Values evicted before every subscriber could read them.
    pub fn dropped_count(&self) -> u64 {
        self.shared.lock().dropped
    }

    /// Values published after the channel was closed.
    pub fn discarded_count(&self) -> u64 {
        self.shared.lock().discarded
    }

    pub fn published_count(&self) -> u64 {
        self.shared.lock().next_seq
    }

    pub fn len(&self) -> usize {
        self.shared.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Independent read cursor. Dropping it affects no one else.
#[derive(Debug)]
pub struct Subscriber<T> {
    shared: Arc<Shared<T>>,
    cursor: u64,
    lagged: u64,
}

impl<T: Clone> Subscriber<T> {
    /// Next unread value, if one is retained.
    pub fn try_next(&mut self) -> Option<T> {
        let shared = Arc::clone(&self.shared);
        let state = shared.lock();
        self.take(&state)
    }

    /// Block until a value is available. `None` once the channel is closed and drained.
    pub fn recv(&mut self) -> Option<T> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.lock();
        loop {
            if let Some(value) = self.take(&state) {
                return Some(value);
            }
            if state.closed {
                return None;
            }
            state = shared
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`recv`](Self::recv) with a deadline.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<T> {
        let deadline = Instant::now() + timeout;
        let shared = Arc::clone(&self.shared);
        let mut state = shared.lock();
        loop {
            if let Some(value) = self.take(&state) {
                return Ok(value);
            }
            if state.closed {
                return Err(TelemetryError::Closed);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TelemetryError::Timeout);
            }
            state = shared
                .available
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Await the next value. `None` once the channel is closed and drained.
    #[cfg(feature = "async")]
    pub async fn recv_async(&mut self) -> Option<T> {
        let shared = Arc::clone(&self.shared);
        loop {
            let mut notified = std::pin::pin!(shared.notify.notified());
            // Register before checking so a publish in between is not missed.
            notified.as_mut().enable();
            {
                let state = shared.lock();
                if let Some(value) = self.take(&state) {
                    return Some(value);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Values this subscriber skipped because they were evicted first.
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    /// Retained values not yet read by this subscriber.
    pub fn pending(&self) -> usize {
        let state = self.shared.lock();
        (state.next_seq - self.cursor.max(state.first_seq())) as usize
    }

    fn take(&mut self, state: &State<T>) -> Option<T> {
        let first = state.first_seq();
        if self.cursor < first {
            self.lagged += first - self.cursor;
            self.cursor = first;
        }
        let value = state.ring.get((self.cursor - first) as usize)?.clone();
        self.cursor += 1;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_drop_oldest_when_full() {
        let channel = TelemetryChannel::new(4);
        let mut sub = channel.subscribe();
        for i in 0..10 {
            channel.publish(i).unwrap();
        }

        let received: Vec<i32> = std::iter::from_fn(|| sub.try_next()).collect();
        assert_eq!(received, [6, 7, 8, 9]);
        assert_eq!(channel.dropped_count(), 6);
        assert_eq!(sub.lagged(), 6);
        assert_eq!(channel.len(), 4);
    }

    #[test]
    fn test_late_subscriber_starts_at_oldest_retained() {
        let channel = TelemetryChannel::new(3);
        for i in 0..5 {
            channel.publish(i).unwrap();
        }
        let mut sub = channel.subscribe();
        assert_eq!(sub.pending(), 3);
        assert_eq!(sub.try_next(), Some(2));
        assert_eq!(sub.lagged(), 0);
        assert_eq!(channel.latest(), Some(4));
    }

    #[test]
    fn test_subscribers_are_independent() {
        let channel = TelemetryChannel::new(8);
        let mut fast = channel.subscribe();
        let mut slow = channel.subscribe();
        channel.publish("a").unwrap();
        channel.publish("b").unwrap();

        assert_eq!(fast.try_next(), Some("a"));
        assert_eq!(fast.try_next(), Some("b"));
        assert_eq!(fast.try_next(), None);
        drop(fast);

        assert_eq!(slow.try_next(), Some("a"));
        assert_eq!(slow.pending(), 1);
    }

    #[test]
    fn test_recv_blocks_until_publish() {
        let channel = TelemetryChannel::new(4);
        let mut sub = channel.subscribe();
        let publisher = channel.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            publisher.publish(42u32).unwrap();
        });

        assert_eq!(sub.recv(), Some(42));
        handle.join().unwrap();
    }

    #[test]
    fn test_close_wakes_waiters() {
        let channel: TelemetryChannel<u8> = TelemetryChannel::new(4);
        let mut sub = channel.subscribe();
        let closer = channel.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            closer.close();
        });

        assert_eq!(sub.recv(), None);
        handle.join().unwrap();
    }

    #[test]
    fn test_publish_after_close_is_counted_noop() {
        let channel = TelemetryChannel::new(4);
        let mut sub = channel.subscribe();
        assert_eq!(channel.publish(1u8), Some(0));
        channel.close();

        assert_eq!(channel.publish(2), None);
        assert_eq!(channel.publish(3), None);
        assert_eq!(channel.discarded_count(), 2);
        assert_eq!(channel.published_count(), 1);
        assert_eq!(channel.latest(), Some(1));
        assert_eq!(sub.recv(), Some(1));
        assert_eq!(sub.recv(), None);
    }

    #[test]
    fn test_closed_channel_drains_before_none() {
        let channel = TelemetryChannel::new(4);
        let mut sub = channel.subscribe();
        channel.publish(1).unwrap();
        channel.close();
        assert_eq!(sub.recv(), Some(1));
        assert_eq!(sub.recv(), None);
    }

    #[test]
    fn test_recv_timeout() {
        let channel: TelemetryChannel<u8> = TelemetryChannel::new(2);
        let mut sub = channel.subscribe();
        let err = sub.recv_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, TelemetryError::Timeout));

        channel.publish(9).unwrap();
        assert_eq!(sub.recv_timeout(Duration::from_millis(10)).unwrap(), 9);
    }

    #[test]
    fn test_publish_never_waits_on_slow_subscriber() {
        let channel = TelemetryChannel::new(DEFAULT_CAPACITY);
        let _idle = channel.subscribe();
        let start = Instant::now();
        for i in 0..10_000u32 {
            channel.publish(i).unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(channel.dropped_count(), 10_000 - DEFAULT_CAPACITY as u64);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let channel = TelemetryChannel::new(0);
        channel.publish(1).unwrap();
        channel.publish(2).unwrap();
        assert_eq!(channel.capacity(), 1);
        assert_eq!(channel.latest(), Some(2));
        assert_eq!(channel.dropped_count(), 1);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_recv_async_wakes_on_publish() {
        let channel = TelemetryChannel::new(4);
        let mut sub = channel.subscribe();
        let publisher = channel.clone();

        let task = tokio::spawn(async move { sub.recv_async().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        publisher.publish(7u16).unwrap();

        assert_eq!(task.await.unwrap(), Some(7));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_recv_async_returns_none_on_close() {
        let channel: TelemetryChannel<u16> = TelemetryChannel::new(4);
        let mut sub = channel.subscribe();
        let closer = channel.clone();

        let task = tokio::spawn(async move { sub.recv_async().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        closer.close();

        assert_eq!(task.await.unwrap(), None);
    }
}
