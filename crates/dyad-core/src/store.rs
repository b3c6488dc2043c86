use crate::error::CoreError;
use async_trait::async_trait;
use dyad_api::types::Message;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Persistence collaborator contract: append, query-by-pair, update-by-id.
/// Implementations own ordering for `history` (ascending creation timestamp,
/// id as tiebreak).
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: &Message) -> Result<(), CoreError>;
    async fn history(&self, a: &str, b: &str) -> Result<Vec<Message>, CoreError>;
    async fn get(&self, id: &str) -> Result<Option<Message>, CoreError>;
    /// Applies the unread -> read transition. Returns the updated message
    /// only when the transition happened here; `None` when the id is unknown
    /// or the message was already read.
    async fn mark_read(&self, id: &str, read_timestamp: u64)
        -> Result<Option<Message>, CoreError>;
}

/// Transient store bounded by process lifetime. Doubles as the failover
/// backend when the primary store is unreachable.
#[derive(Clone, Default)]
pub struct MemoryStore {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, message: &Message) -> Result<(), CoreError> {
        let mut messages = self.messages.lock().await;
        messages.push(message.clone());
        Ok(())
    }

    async fn history(&self, a: &str, b: &str) -> Result<Vec<Message>, CoreError> {
        let messages = self.messages.lock().await;
        let mut pair: Vec<Message> = messages
            .iter()
            .filter(|m| {
                (m.sender == a && m.recipient == b) || (m.sender == b && m.recipient == a)
            })
            .cloned()
            .collect();
        pair.sort_by(|left, right| {
            left.timestamp
                .cmp(&right.timestamp)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(pair)
    }

    async fn get(&self, id: &str) -> Result<Option<Message>, CoreError> {
        let messages = self.messages.lock().await;
        Ok(messages.iter().find(|m| m.id == id).cloned())
    }

    async fn mark_read(
        &self,
        id: &str,
        read_timestamp: u64,
    ) -> Result<Option<Message>, CoreError> {
        let mut messages = self.messages.lock().await;
        let Some(message) = messages.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        if message.read {
            return Ok(None);
        }
        message.read = true;
        message.read_timestamp = Some(read_timestamp);
        Ok(Some(message.clone()))
    }
}

/// Every operation tries the primary store first and degrades to the
/// transient store on failure. Transient copies are visible only while the
/// primary is down.
#[derive(Clone)]
pub struct FailoverStore {
    primary: Arc<dyn MessageStore>,
    transient: MemoryStore,
}

impl FailoverStore {
    pub fn new(primary: Arc<dyn MessageStore>) -> Self {
        Self {
            primary,
            transient: MemoryStore::new(),
        }
    }

    pub async fn append(&self, message: &Message) {
        if let Err(err) = self.primary.append(message).await {
            log::warn!(
                "primary store rejected message {}, keeping a transient copy: {err}",
                message.id
            );
            let _ = self.transient.append(message).await;
        }
    }

    pub async fn history(&self, a: &str, b: &str) -> Vec<Message> {
        match self.primary.history(a, b).await {
            Ok(messages) => messages,
            Err(err) => {
                log::warn!("primary store history failed, serving transient copies: {err}");
                self.transient.history(a, b).await.unwrap_or_default()
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<Message> {
        match self.primary.get(id).await {
            Ok(Some(message)) => Some(message),
            Ok(None) => self.transient.get(id).await.unwrap_or_default(),
            Err(err) => {
                log::warn!("primary store lookup of {id} failed: {err}");
                self.transient.get(id).await.unwrap_or_default()
            }
        }
    }

    pub async fn mark_read(&self, id: &str, read_timestamp: u64) -> Option<Message> {
        match self.primary.mark_read(id, read_timestamp).await {
            Ok(Some(updated)) => Some(updated),
            Ok(None) => self
                .transient
                .mark_read(id, read_timestamp)
                .await
                .unwrap_or_default(),
            Err(err) => {
                log::warn!("primary store update of {id} failed: {err}");
                self.transient
                    .mark_read(id, read_timestamp)
                    .await
                    .unwrap_or_default()
            }
        }
    }

    pub async fn transient_len(&self) -> usize {
        self.transient.len().await
    }
}
