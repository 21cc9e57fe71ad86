//! Collection snapshot fan-out shared by the bundled stores

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use super::{CollectionPath, Document};

/// Live feed of full snapshots for one collection
///
/// Delivery is serial: snapshots arrive in commit order. Dropping the
/// subscription stops delivery.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    path: CollectionPath,
    receiver: mpsc::UnboundedReceiver<Vec<Document>>,
}

impl Subscription {
    /// Wait for the next snapshot; `None` once the store is gone
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        self.receiver.recv().await
    }

    /// Take a snapshot that has already been delivered, without waiting
    pub fn try_next(&mut self) -> Option<Vec<Document>> {
        self.receiver.try_recv().ok()
    }

    /// Collection this subscription observes
    #[must_use]
    pub const fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Hub-assigned subscription id
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving snapshots
    pub fn unsubscribe(mut self) {
        self.receiver.close();
    }
}

type Senders = Vec<(u64, mpsc::UnboundedSender<Vec<Document>>)>;

/// Registry of subscribers per collection
///
/// Callers must publish while holding their store's write lock so snapshot
/// order matches commit order.
#[derive(Debug, Default)]
pub struct SubscriptionHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<CollectionPath, Senders>>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and hand it `initial` as its first snapshot
    pub fn subscribe(&self, path: &CollectionPath, initial: Vec<Document>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        // Receiver is alive, so the initial send cannot fail.
        let _ = sender.send(initial);

        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.clone())
            .or_default()
            .push((id, sender));

        tracing::debug!(collection = %path, subscription = id, "Subscriber registered");

        Subscription {
            id,
            path: path.clone(),
            receiver,
        }
    }

    /// Whether anyone is still listening on `path`
    pub fn has_subscribers(&self, path: &CollectionPath) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .is_some_and(|senders| senders.iter().any(|(_, sender)| !sender.is_closed()))
    }

    /// Whether any collection still has a live subscriber
    pub fn has_any_subscribers(&self) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flatten()
            .any(|(_, sender)| !sender.is_closed())
    }

    /// Collections with at least one live subscriber
    pub fn subscribed_paths(&self) -> Vec<CollectionPath> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, senders)| senders.iter().any(|(_, sender)| !sender.is_closed()))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Deliver `snapshot` to every live subscriber of `path`, pruning closed ones
    pub fn publish(&self, path: &CollectionPath, snapshot: &[Document]) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(senders) = subscribers.get_mut(path) else {
            return;
        };

        senders.retain(|(id, sender)| {
            let delivered = sender.send(snapshot.to_vec()).is_ok();
            if !delivered {
                tracing::debug!(collection = %path, subscription = id, "Subscriber dropped");
            }
            delivered
        });

        if senders.is_empty() {
            subscribers.remove(path);
        }
    }
}
