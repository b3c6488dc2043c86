use crate::time::now_ms;
use dyad_api::events::ServerEvent;
use dyad_api::types::{StatusNotice, UserStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub type ConnectionId = u64;

/// Opaque reference to one live client connection. Pushing never blocks and
/// never fails loudly; a closed connection simply drops the frame.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(outbound: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn push(&self, event: ServerEvent) {
        if self.outbound.send(event).is_err() {
            log::debug!("dropped frame for closed connection {}", self.id);
        }
    }
}

struct PresenceEntry {
    handle: ConnectionHandle,
    since_ms: u64,
}

/// Identity -> live connection map behind a single lock. At most one handle
/// per identity; a second login supersedes the first.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    entries: Arc<Mutex<HashMap<String, PresenceEntry>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, identity: &str, handle: ConnectionHandle) {
        if identity.trim().is_empty() {
            log::warn!("login with empty identity ignored");
            return;
        }
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(
            identity.to_string(),
            PresenceEntry {
                handle: handle.clone(),
                since_ms: now_ms(),
            },
        );
        if let Some(previous) = previous {
            if previous.handle.id() != handle.id() {
                log::info!(
                    "{identity} reconnected, connection {} supersedes {}",
                    handle.id(),
                    previous.handle.id()
                );
            }
        } else {
            log::info!("{identity} is now online on connection {}", handle.id());
        }
        let notice = ServerEvent::UserStatus(StatusNotice {
            identity: identity.to_string(),
            status: UserStatus::Online,
        });
        for entry in entries.values() {
            entry.handle.push(notice.clone());
        }
        // Replay the current online set so the newcomer does not miss
        // broadcasts that predate its registration.
        for (other, _) in entries.iter() {
            if other.as_str() != identity {
                handle.push(ServerEvent::UserStatus(StatusNotice {
                    identity: other.clone(),
                    status: UserStatus::Online,
                }));
            }
        }
    }

    /// Reverse lookup by connection. A handle that was never associated with
    /// an identity (disconnect before login) or was already superseded is a
    /// silent no-op.
    pub async fn unregister(&self, connection: ConnectionId) {
        let mut entries = self.entries.lock().await;
        let owner = entries
            .iter()
            .find(|(_, entry)| entry.handle.id() == connection)
            .map(|(identity, _)| identity.clone());
        let Some(identity) = owner else {
            log::debug!("connection {connection} was not associated with any identity");
            return;
        };
        entries.remove(&identity);
        log::info!("{identity} is now offline");
        let notice = ServerEvent::UserStatus(StatusNotice {
            identity,
            status: UserStatus::Offline,
        });
        for entry in entries.values() {
            entry.handle.push(notice.clone());
        }
    }

    pub async fn lookup(&self, identity: &str) -> Option<ConnectionHandle> {
        let entries = self.entries.lock().await;
        entries.get(identity).map(|entry| entry.handle.clone())
    }

    pub async fn is_online(&self, identity: &str) -> bool {
        self.lookup(identity).await.is_some()
    }

    pub async fn online_since(&self, identity: &str) -> Option<u64> {
        let entries = self.entries.lock().await;
        entries.get(identity).map(|entry| entry.since_ms)
    }

    /// Broadcasts the current status of `identity` to all connected parties,
    /// not just the requester.
    pub async fn broadcast_status(&self, identity: &str) {
        let entries = self.entries.lock().await;
        let status = if entries.contains_key(identity) {
            UserStatus::Online
        } else {
            UserStatus::Offline
        };
        let notice = ServerEvent::UserStatus(StatusNotice {
            identity: identity.to_string(),
            status,
        });
        for entry in entries.values() {
            entry.handle.push(notice.clone());
        }
    }

    pub async fn online_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}
