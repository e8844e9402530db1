// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Messages formatted before the forwarder is ready.
//!
//! The queue and its `closed` flag share one mutex. Draining closes the queue at the
//! exact moment it is observed empty, so a producer either lands in the queue (and is
//! drained in order) or is told to send directly after every queued message has
//! already been handed to the transport.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::debug;

use crate::formatter::FormattedMessage;
use crate::transport::Transport;

/// Result of offering a message to the queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// The queue no longer accepts messages; the caller owns the message again.
    Closed(FormattedMessage),
}

#[derive(Debug, Default)]
struct QueueInner {
    messages: VecDeque<FormattedMessage>,
    closed: bool,
}

/// Unbounded FIFO of formatted messages, safe for many concurrent producers.
#[derive(Debug, Default)]
pub struct PendingQueue {
    inner: Mutex<QueueInner>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, message: FormattedMessage) -> Enqueued {
        #[allow(clippy::expect_used)]
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.closed {
            return Enqueued::Closed(message);
        }
        inner.messages.push_back(message);
        Enqueued::Queued
    }

    /// Pops the oldest message, or closes the queue if there is none.
    pub fn pop_or_close(&self) -> Option<FormattedMessage> {
        #[allow(clippy::expect_used)]
        let mut inner = self.inner.lock().expect("lock poisoned");
        let message = inner.messages.pop_front();
        if message.is_none() {
            inner.closed = true;
        }
        message
    }

    /// Closes the queue and drops everything still in it. Returns how many messages
    /// were discarded.
    pub fn close_and_discard(&self) -> usize {
        #[allow(clippy::expect_used)]
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.closed = true;
        let discarded = inner.messages.len();
        inner.messages.clear();
        discarded
    }

    /// Hands every queued message to `transport` in FIFO order, yielding to the
    /// scheduler between messages, and leaves the queue closed. Returns the number of
    /// messages drained.
    pub async fn drain_into(&self, transport: &Transport) -> usize {
        let mut drained = 0;
        while let Some(message) = self.pop_or_close() {
            transport.send(message);
            drained += 1;
            tokio::task::yield_now().await;
        }
        debug!("Drained {} pending messages", drained);
        drained
    }

    pub fn len(&self) -> usize {
        #[allow(clippy::expect_used)]
        let inner = self.inner.lock().expect("lock poisoned");
        inner.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        #[allow(clippy::expect_used)]
        let inner = self.inner.lock().expect("lock poisoned");
        inner.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::format_message;
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn message(payload: &str) -> FormattedMessage {
        format_message(
            14,
            OffsetDateTime::UNIX_EPOCH,
            "host",
            "app",
            "test",
            None,
            payload,
        )
    }

    fn payload(message: &FormattedMessage) -> &str {
        message.as_str().rsplit(' ').next().unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let queue = PendingQueue::new();
        for i in 0..5 {
            assert_eq!(queue.enqueue(message(&i.to_string())), Enqueued::Queued);
        }
        assert_eq!(queue.len(), 5);

        let popped: Vec<String> = std::iter::from_fn(|| queue.pop_or_close())
            .map(|m| payload(&m).to_string())
            .collect();
        assert_eq!(popped, vec!["0", "1", "2", "3", "4"]);
        assert!(queue.is_closed());
    }

    #[test]
    fn test_enqueue_after_close_returns_message() {
        let queue = PendingQueue::new();
        assert!(queue.pop_or_close().is_none());
        match queue.enqueue(message("late")) {
            Enqueued::Closed(returned) => assert_eq!(payload(&returned), "late"),
            Enqueued::Queued => panic!("closed queue accepted a message"),
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_close_and_discard() {
        let queue = PendingQueue::new();
        queue.enqueue(message("a"));
        queue.enqueue(message("b"));
        assert_eq!(queue.close_and_discard(), 2);
        assert!(queue.is_empty());
        assert!(matches!(queue.enqueue(message("c")), Enqueued::Closed(_)));
    }

    #[test]
    fn test_concurrent_producers_keep_per_producer_order() {
        let queue = Arc::new(PendingQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        queue.enqueue(message(&format!("{producer}:{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 1_000);
        let mut last_seen = [None::<u32>; 4];
        while let Some(m) = queue.pop_or_close() {
            let (producer, i) = payload(&m).split_once(':').unwrap();
            let producer: usize = producer.parse().unwrap();
            let i: u32 = i.parse().unwrap();
            if let Some(previous) = last_seen[producer] {
                assert!(i > previous);
            }
            last_seen[producer] = Some(i);
        }
        assert!(last_seen.iter().all(|seen| *seen == Some(249)));
    }
}
