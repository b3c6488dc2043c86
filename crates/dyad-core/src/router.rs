use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::ids::next_message_id;
use crate::presence::PresenceRegistry;
use crate::receipts::ReadReceiptReconciler;
use crate::store::FailoverStore;
use crate::time::now_ms;
use dyad_api::events::ServerEvent;
use dyad_api::types::{Message, OutgoingMessage};
use dyad_api::validation::{validate_outgoing, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

/// Pending automatic read confirmations, keyed by message id. An explicit
/// mark-read cancels the timer; a recipient disconnect is handled by the
/// fresh presence check at fire time.
#[derive(Clone, Default)]
pub struct AutoReadTimers {
    pending: Arc<Mutex<HashMap<String, AbortHandle>>>,
}

impl AutoReadTimers {
    pub async fn insert(&self, message_id: String, handle: AbortHandle) {
        let mut pending = self.pending.lock().await;
        if let Some(stale) = pending.insert(message_id, handle) {
            stale.abort();
        }
    }

    pub async fn remove(&self, message_id: &str) {
        self.pending.lock().await.remove(message_id);
    }

    pub async fn cancel(&self, message_id: &str) {
        if let Some(handle) = self.pending.lock().await.remove(message_id) {
            handle.abort();
        }
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// Routes an outbound message: validate, persist, push to a live recipient,
/// schedule the delayed automatic read confirmation.
#[derive(Clone)]
pub struct DeliveryRouter {
    config: CoreConfig,
    registry: PresenceRegistry,
    store: FailoverStore,
    receipts: ReadReceiptReconciler,
    timers: AutoReadTimers,
}

impl DeliveryRouter {
    pub fn new(
        config: CoreConfig,
        registry: PresenceRegistry,
        store: FailoverStore,
        receipts: ReadReceiptReconciler,
        timers: AutoReadTimers,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            receipts,
            timers,
        }
    }

    pub async fn send(
        &self,
        sender: &str,
        recipient: &str,
        body: &str,
        client_timestamp: Option<u64>,
    ) -> Result<Message, CoreError> {
        let outgoing = OutgoingMessage {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            body: body.to_string(),
            timestamp: client_timestamp,
        };
        match validate_outgoing(&outgoing, &self.config.limits()) {
            Ok(()) => {}
            Err(ValidationError::SelfAddressed) => return Err(CoreError::SelfAddressed),
            Err(ValidationError::Empty(field)) => {
                return Err(CoreError::InvalidMessage(field));
            }
            Err(ValidationError::TooLong(field)) => {
                return Err(CoreError::InvalidMessage(field));
            }
        }
        let message = Message {
            id: next_message_id(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            body: body.to_string(),
            timestamp: client_timestamp.unwrap_or_else(now_ms),
            read: false,
            read_timestamp: None,
        };
        self.store.append(&message).await;
        match self.registry.lookup(recipient).await {
            Some(handle) => {
                log::debug!("pushing {} to {recipient} on connection {}", message.id, handle.id());
                handle.push(ServerEvent::NewMessage(message.clone()));
                self.schedule_auto_read(&message).await;
            }
            None => {
                log::debug!(
                    "{recipient} is offline, {} stays queued for the next history fetch",
                    message.id
                );
            }
        }
        Ok(message)
    }

    pub async fn history(&self, a: &str, b: &str) -> Vec<Message> {
        self.store.history(a, b).await
    }

    /// A reachable, foregrounded recipient is assumed to read promptly; the
    /// confirmation fires only if the recipient is still registered when the
    /// delay elapses.
    async fn schedule_auto_read(&self, message: &Message) {
        let delay = Duration::from_millis(self.config.auto_read_delay_ms);
        let message_id = message.id.clone();
        let recipient = message.recipient.clone();
        let registry = self.registry.clone();
        let receipts = self.receipts.clone();
        let timers = self.timers.clone();
        let task_id = message_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            timers.remove(&task_id).await;
            if !registry.is_online(&recipient).await {
                log::debug!("{recipient} went offline before auto-read of {task_id}");
                return;
            }
            match receipts.mark_read(&task_id, &recipient).await {
                Ok(_) | Err(CoreError::NotFound) => {}
                Err(err) => log::warn!("auto-read of {task_id} failed: {err}"),
            }
        });
        self.timers.insert(message_id, task.abort_handle()).await;
    }

    pub async fn pending_auto_reads(&self) -> usize {
        self.timers.len().await
    }
}
