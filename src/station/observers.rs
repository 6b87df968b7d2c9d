//! # Observer Hub
//!
//! Fan-out of observer envelopes to subscribers.
//!
//! Each observer gets its own bounded channel. A message is encoded once and
//! shared between observers. Delivery never blocks: an observer whose channel
//! is full or closed is dropped from the hub and the rest still receive the
//! message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::link::ObserverMessage;

/// Receiving end handed to a subscriber.
#[derive(Debug)]
pub struct Observer {
    id: u64,
    rx: mpsc::Receiver<Arc<str>>,
}

impl Observer {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next encoded envelope, or `None` once removed from the hub.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug)]
pub struct ObserverHub {
    buffer: usize,
    next_id: AtomicU64,
    senders: Mutex<Vec<(u64, mpsc::Sender<Arc<str>>)>>,
}

impl ObserverHub {
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            next_id: AtomicU64::new(1),
            senders: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(u64, mpsc::Sender<Arc<str>>)>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Observer {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.lock().push((id, tx));
        debug!("Observer {} subscribed", id);
        Observer { id, rx }
    }

    /// Returns true if the observer was registered.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut senders = self.lock();
        let before = senders.len();
        senders.retain(|(observer, _)| *observer != id);
        senders.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sends `message` to every observer. Returns how many received it.
    pub fn broadcast(&self, message: &ObserverMessage) -> usize {
        let encoded: Arc<str> = match message.encode() {
            Ok(text) => Arc::from(text),
            Err(e) => {
                warn!("Failed to encode {} envelope: {}", message.kind(), e);
                return 0;
            }
        };

        let mut delivered = 0;
        self.lock().retain(|(id, tx)| match tx.try_send(Arc::clone(&encoded)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Observer {} is not keeping up, dropping it", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Observer {} went away", id);
                false
            }
        });
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failsafe::FailsafeSnapshot;

    fn message() -> ObserverMessage {
        ObserverMessage::Failsafe {
            failsafe: FailsafeSnapshot::default(),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all() {
        let hub = ObserverHub::new(4);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_ne!(a.id(), b.id());

        assert_eq!(hub.broadcast(&message()), 2);
        let frame = a.recv().await.unwrap();
        assert!(frame.contains("\"type\":\"failsafe\""));
        assert_eq!(b.recv().await.unwrap(), frame);
    }

    #[tokio::test]
    async fn test_closed_observer_is_removed() {
        let hub = ObserverHub::new(4);
        let a = hub.subscribe();
        let mut b = hub.subscribe();
        drop(a);

        assert_eq!(hub.broadcast(&message()), 1);
        assert_eq!(hub.len(), 1);
        assert!(b.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_full_observer_is_removed_others_still_served() {
        let hub = ObserverHub::new(1);
        let mut slow = hub.subscribe();
        let mut fast = hub.subscribe();

        assert_eq!(hub.broadcast(&message()), 2);
        assert!(fast.try_recv().is_some());

        // `slow` never drained its single slot
        assert_eq!(hub.broadcast(&message()), 1);
        assert_eq!(hub.len(), 1);
        assert!(fast.try_recv().is_some());

        assert!(slow.recv().await.is_some());
        assert!(slow.recv().await.is_none());
    }

    #[test]
    fn test_unsubscribe() {
        let hub = ObserverHub::new(4);
        let observer = hub.subscribe();
        assert!(hub.unsubscribe(observer.id()));
        assert!(!hub.unsubscribe(observer.id()));
        assert!(hub.is_empty());
        assert_eq!(hub.broadcast(&message()), 0);
    }
}
