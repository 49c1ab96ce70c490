//! Watch system for cache update notifications.
//!
//! A [`Watch`] subscribes to one resource kind for one node and receives an
//! [`Update`] carrying the new version every time that kind changes. The
//! serving layer then calls [`Cache::fetch`](crate::Cache::fetch) to pull
//! the resources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use xds_core::{NodeHash, ResourceKind, ResourceVersion, XdsError, XdsResult};

/// Unique identifier for a watch subscription.
///
/// Identifiers are unique across every store in the process, so a
/// multiplexer can forward a cancellation to all of its backing stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

impl WatchId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric value of this watch ID.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// Notification that a resource kind changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// The kind that changed.
    pub kind: ResourceKind,
    /// Its new version.
    pub version: ResourceVersion,
}

/// A subscription to changes of one resource kind.
#[derive(Debug)]
pub struct Watch {
    id: WatchId,
    node: NodeHash,
    kind: ResourceKind,
    receiver: mpsc::Receiver<Update>,
}

impl Watch {
    /// A watch that never fires, for kinds no store serves.
    pub(crate) fn closed(node: NodeHash, kind: ResourceKind) -> Self {
        let (_, receiver) = mpsc::channel(1);
        Self {
            id: WatchId::next(),
            node,
            kind,
            receiver,
        }
    }

    /// Get the unique identifier for this watch.
    #[inline]
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Node this watch is subscribed for.
    #[inline]
    pub fn node(&self) -> NodeHash {
        self.node
    }

    /// Resource kind this watch is subscribed to.
    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Receive the next update.
    ///
    /// Returns `None` once the watch has been cancelled.
    pub async fn recv(&mut self) -> Option<Update> {
        self.receiver.recv().await
    }

    /// Try to receive an update without waiting.
    pub fn try_recv(&mut self) -> Result<Update, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

#[derive(Debug, Clone)]
struct WatchSender {
    id: WatchId,
    sender: mpsc::Sender<Update>,
}

impl WatchSender {
    /// A full channel drops the update; the receiver already has a pending
    /// one and fetches the latest state when it handles it.
    fn try_send(&self, update: Update) -> XdsResult<()> {
        match self.sender.try_send(update) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!(watch_id = %self.id, "watch channel full, skipping update");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(XdsError::WatchClosed {
                watch_id: self.id.0,
            }),
        }
    }
}

/// Manager for watch subscriptions of one store.
#[derive(Debug)]
pub struct WatchManager {
    watches: Mutex<HashMap<(NodeHash, ResourceKind), Vec<WatchSender>>>,
    channel_buffer: usize,
}

impl Default for WatchManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchManager {
    /// Create a new watch manager with default settings.
    pub fn new() -> Self {
        Self::with_buffer_size(16)
    }

    /// Create a new watch manager with a custom channel buffer size.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            watches: Mutex::new(HashMap::new()),
            channel_buffer: buffer_size.max(1),
        }
    }

    /// Subscribe to changes of `kind` for `node`.
    pub fn create_watch(&self, node: NodeHash, kind: ResourceKind) -> Watch {
        let id = WatchId::next();
        let (sender, receiver) = mpsc::channel(self.channel_buffer);

        self.watches
            .lock()
            .entry((node, kind))
            .or_default()
            .push(WatchSender { id, sender });

        debug!(watch_id = %id, node = %node, kind = %kind, "created watch");

        Watch {
            id,
            node,
            kind,
            receiver,
        }
    }

    /// Cancel a watch. Returns whether this manager knew the watch.
    pub fn cancel_watch(&self, watch_id: WatchId) -> bool {
        let mut watches = self.watches.lock();
        for senders in watches.values_mut() {
            if let Some(pos) = senders.iter().position(|s| s.id == watch_id) {
                senders.swap_remove(pos);
                debug!(watch_id = %watch_id, "cancelled watch");
                return true;
            }
        }
        false
    }

    /// Notify watches that `update.kind` changed for `node`.
    ///
    /// A wildcard `node` notifies every watch on that kind regardless of the
    /// node it was created for. Closed watches are dropped. Returns the
    /// number of watches notified.
    pub fn notify(&self, node: NodeHash, update: &Update) -> usize {
        let senders: Vec<WatchSender> = {
            let watches = self.watches.lock();
            watches
                .iter()
                .filter(|((n, k), _)| *k == update.kind && (node.is_wildcard() || *n == node))
                .flat_map(|(_, senders)| senders.iter().cloned())
                .collect()
        };

        if senders.is_empty() {
            return 0;
        }

        let closed: Vec<WatchId> = senders
            .iter()
            .filter(|s| s.try_send(update.clone()).is_err())
            .map(|s| s.id)
            .collect();

        if !closed.is_empty() {
            let mut watches = self.watches.lock();
            for senders in watches.values_mut() {
                senders.retain(|s| !closed.contains(&s.id));
            }
            debug!(count = closed.len(), "removed closed watches");
        }

        let notified = senders.len() - closed.len();
        trace!(node = %node, kind = %update.kind, version = %update.version, notified, "notified watches");
        notified
    }

    /// Number of active watches for a node and kind.
    pub fn watch_count(&self, node: NodeHash, kind: ResourceKind) -> usize {
        self.watches
            .lock()
            .get(&(node, kind))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Total number of active watches.
    pub fn total_watch_count(&self) -> usize {
        self.watches.lock().values().map(Vec::len).sum()
    }
}
