use crate::error::CoreError;
use crate::presence::PresenceRegistry;
use crate::router::AutoReadTimers;
use crate::store::FailoverStore;
use crate::time::now_ms;
use dyad_api::events::ServerEvent;
use dyad_api::types::ReadReceipt;

/// Applies the Unread -> Read transition exactly once per message and tells
/// the original sender about it. The transition is terminal.
#[derive(Clone)]
pub struct ReadReceiptReconciler {
    registry: PresenceRegistry,
    store: FailoverStore,
    timers: AutoReadTimers,
}

impl ReadReceiptReconciler {
    pub fn new(registry: PresenceRegistry, store: FailoverStore, timers: AutoReadTimers) -> Self {
        Self {
            registry,
            store,
            timers,
        }
    }

    /// Marking an already-read message again succeeds without side effects;
    /// only the first application notifies the sender. A reader other than
    /// the recipient gets `NotAuthorized` and the state stays untouched.
    pub async fn mark_read(
        &self,
        message_id: &str,
        reader: &str,
    ) -> Result<ReadReceipt, CoreError> {
        let Some(message) = self.store.get(message_id).await else {
            return Err(CoreError::NotFound);
        };
        if message.recipient != reader {
            log::warn!("{reader} attempted to mark {message_id} read without being its recipient");
            return Err(CoreError::NotAuthorized);
        }
        self.timers.cancel(message_id).await;
        let read_timestamp = now_ms();
        let Some(updated) = self.store.mark_read(message_id, read_timestamp).await else {
            // Already read: idempotent success, no second notification.
            return Ok(ReadReceipt {
                message_id: message_id.to_string(),
                reader: reader.to_string(),
                read_timestamp: message.read_timestamp.unwrap_or(read_timestamp),
            });
        };
        let receipt = ReadReceipt {
            message_id: updated.id.clone(),
            reader: reader.to_string(),
            read_timestamp,
        };
        match self.registry.lookup(&updated.sender).await {
            Some(handle) => handle.push(ServerEvent::MessageRead(receipt.clone())),
            None => log::debug!(
                "{} is offline, read receipt for {message_id} dropped",
                updated.sender
            ),
        }
        Ok(receipt)
    }
}
