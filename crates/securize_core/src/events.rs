//! Change notification for content views.
//!
//! # Responsibility
//! - Deliver "reload now" signals to every view mounted in one document
//!   (same-document channel, synchronous).
//! - Relay storage-change signals to *other* documents sharing one profile
//!   (cross-document channel, queued until the receiving document polls).
//!
//! # Invariants
//! - The writing document never receives its own `StorageChanged` signal.
//! - A detached or dropped document silently misses later signals.
//! - Listener dispatch works on a snapshot, so listeners may subscribe or
//!   unsubscribe while being called.

use log::debug;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Identity of one document (a tab or window) attached to a profile.
pub type DocumentId = Uuid;

/// Handle returned by `DocumentEvents::subscribe`.
pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Signal delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A write happened in this document. Carries no payload.
    StoreUpdated,
    /// Another document overwrote or removed `key`.
    StorageChanged { key: String },
    /// The document regained focus. Freshness hint only.
    FocusRegained,
}

/// Profile-wide relay for cross-document storage signals.
#[derive(Default)]
pub struct ProfileBus {
    documents: Mutex<Vec<(DocumentId, Sender<String>)>>,
}

impl ProfileBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attaches a new document to this profile.
    pub fn attach(self: &Arc<Self>) -> Arc<DocumentEvents> {
        let (sender, receiver) = mpsc::channel();
        let id = Uuid::new_v4();
        lock(&self.documents).push((id, sender));
        Arc::new(DocumentEvents {
            id,
            listeners: Mutex::new(BTreeMap::new()),
            next_subscription: AtomicU64::new(1),
            inbox: Mutex::new(Some(receiver)),
            bus: Some(Arc::clone(self)),
        })
    }

    /// Number of documents still reachable.
    pub fn document_count(&self) -> usize {
        lock(&self.documents).len()
    }

    fn signal_others(&self, origin: DocumentId, key: &str) -> usize {
        let mut documents = lock(&self.documents);
        // A failed send means the receiving document is gone.
        documents.retain(|(id, sender)| *id == origin || sender.send(key.to_string()).is_ok());
        documents.iter().filter(|(id, _)| *id != origin).count()
    }

    fn detach(&self, document: DocumentId) {
        lock(&self.documents).retain(|(id, _)| *id != document);
    }
}

/// Per-document listener registry.
pub struct DocumentEvents {
    id: DocumentId,
    listeners: Mutex<BTreeMap<SubscriptionId, Listener>>,
    next_subscription: AtomicU64,
    inbox: Mutex<Option<Receiver<String>>>,
    bus: Option<Arc<ProfileBus>>,
}

impl DocumentEvents {
    /// Creates a document that is not attached to any profile bus.
    pub fn standalone() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            listeners: Mutex::new(BTreeMap::new()),
            next_subscription: AtomicU64::new(1),
            inbox: Mutex::new(None),
            bus: None,
        })
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Registers a listener and returns the handle needed to remove it.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).insert(id, Arc::new(listener));
        id
    }

    /// Removes a listener. Returns `false` when the handle was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.listeners).remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Announces a completed write of `key`.
    ///
    /// Listeners of this document run before this call returns; other
    /// documents on the same bus get a queued `StorageChanged` signal.
    pub fn notify_write(&self, key: &str) {
        self.dispatch(&ChangeEvent::StoreUpdated);
        if let Some(bus) = &self.bus {
            let reached = bus.signal_others(self.id, key);
            debug!("event=storage_signal module=events status=ok key={key} documents={reached}");
        }
    }

    /// Delivers queued cross-document signals. Returns how many were delivered.
    pub fn poll_storage_events(&self) -> usize {
        let pending: Vec<String> = match lock(&self.inbox).as_ref() {
            Some(receiver) => receiver.try_iter().collect(),
            None => return 0,
        };
        for key in &pending {
            self.dispatch(&ChangeEvent::StorageChanged { key: key.clone() });
        }
        pending.len()
    }

    /// Raises the focus freshness hint.
    pub fn notify_focus(&self) {
        self.dispatch(&ChangeEvent::FocusRegained);
    }

    /// Stops receiving cross-document signals and drops queued ones.
    pub fn detach(&self) {
        if let Some(bus) = &self.bus {
            bus.detach(self.id);
        }
        lock(&self.inbox).take();
    }

    fn dispatch(&self, event: &ChangeEvent) {
        let snapshot: Vec<Listener> = lock(&self.listeners).values().cloned().collect();
        debug!(
            "event=change_dispatch module=events status=ok kind={:?} listeners={}",
            event,
            snapshot.len()
        );
        for listener in snapshot {
            listener(event);
        }
    }
}

impl Drop for DocumentEvents {
    fn drop(&mut self) {
        if let Some(bus) = &self.bus {
            bus.detach(self.id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
