pub mod config;
pub mod error;
pub mod ids;
pub mod presence;
pub mod receipts;
pub mod router;
pub mod sqlite;
pub mod store;
pub mod time;

use config::CoreConfig;
use dyad_api::events::ServerEvent;
use dyad_api::types::{Message, ReadReceipt, TypingNotice, TypingSignal};
use error::CoreError;
use presence::{ConnectionHandle, ConnectionId, PresenceRegistry};
use receipts::ReadReceiptReconciler;
use router::{AutoReadTimers, DeliveryRouter};
use std::sync::Arc;
use store::{FailoverStore, MessageStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreStats {
    pub online_users: usize,
    pub transient_messages: usize,
    pub pending_auto_reads: usize,
}

/// Transport-agnostic coordination core. Both the push channel and the
/// fallback HTTP channel drive these operations, so a message submitted via
/// either path is indistinguishable once stored.
#[derive(Clone)]
pub struct Core {
    config: CoreConfig,
    registry: PresenceRegistry,
    store: FailoverStore,
    router: DeliveryRouter,
    receipts: ReadReceiptReconciler,
}

impl Core {
    pub fn new(config: CoreConfig, primary: Arc<dyn MessageStore>) -> Self {
        let registry = PresenceRegistry::new();
        let store = FailoverStore::new(primary);
        let timers = AutoReadTimers::default();
        let receipts =
            ReadReceiptReconciler::new(registry.clone(), store.clone(), timers.clone());
        let router = DeliveryRouter::new(
            config.clone(),
            registry.clone(),
            store.clone(),
            receipts.clone(),
            timers,
        );
        Self {
            config,
            registry,
            store,
            router,
            receipts,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    /// Records the identity as online on this connection. Last writer wins;
    /// registration never fails.
    pub async fn login(&self, identity: &str, handle: ConnectionHandle) {
        self.registry.register(identity, handle).await;
    }

    pub async fn disconnect(&self, connection: ConnectionId) {
        self.registry.unregister(connection).await;
    }

    pub async fn send(
        &self,
        sender: &str,
        recipient: &str,
        body: &str,
        client_timestamp: Option<u64>,
    ) -> Result<Message, CoreError> {
        self.router.send(sender, recipient, body, client_timestamp).await
    }

    /// All messages between the pair, in either direction, ascending by
    /// creation timestamp. Never errors; an unreachable store yields
    /// whatever transient copies exist.
    pub async fn history(&self, a: &str, b: &str) -> Vec<Message> {
        self.router.history(a, b).await
    }

    pub async fn mark_read(
        &self,
        message_id: &str,
        reader: &str,
    ) -> Result<ReadReceipt, CoreError> {
        self.receipts.mark_read(message_id, reader).await
    }

    /// Typing signals are transient: routed to the recipient's live
    /// connection when there is one, dropped otherwise.
    pub async fn typing(&self, signal: TypingSignal) {
        if !self.config.enable_typing {
            return;
        }
        if let Some(handle) = self.registry.lookup(&signal.recipient).await {
            handle.push(ServerEvent::UserTyping(TypingNotice {
                sender: signal.sender,
                is_typing: signal.is_typing,
            }));
        }
    }

    pub async fn check_status(&self, identity: &str) {
        self.registry.broadcast_status(identity).await;
    }

    pub async fn stats(&self) -> CoreStats {
        CoreStats {
            online_users: self.registry.online_count().await,
            transient_messages: self.store.transient_len().await,
            pending_auto_reads: self.router.pending_auto_reads().await,
        }
    }
}

#[cfg(test)]
mod tests;
