pub mod presence_tests;
pub mod typing_tests;

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::presence::ConnectionHandle;
use crate::store::{MemoryStore, MessageStore};
use crate::Core;
use async_trait::async_trait;
use dyad_api::events::ServerEvent;
use dyad_api::types::Message;
use std::sync::Arc;
use tokio::sync::mpsc;

pub fn test_config() -> CoreConfig {
    CoreConfig {
        auto_read_delay_ms: 50,
        ..CoreConfig::default()
    }
}

pub fn memory_core() -> Core {
    Core::new(test_config(), Arc::new(MemoryStore::new()))
}

pub fn connection() -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ConnectionHandle::new(tx), rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn pushed_messages(events: &[ServerEvent]) -> Vec<Message> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::NewMessage(message) => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn read_receipts(events: &[ServerEvent]) -> Vec<dyad_api::types::ReadReceipt> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::MessageRead(receipt) => Some(receipt.clone()),
            _ => None,
        })
        .collect()
}

/// Stands in for an unreachable persistence backend.
#[derive(Clone, Default)]
pub struct BrokenStore;

#[async_trait]
impl MessageStore for BrokenStore {
    async fn append(&self, _message: &Message) -> Result<(), CoreError> {
        Err(CoreError::Storage)
    }

    async fn history(&self, _a: &str, _b: &str) -> Result<Vec<Message>, CoreError> {
        Err(CoreError::Storage)
    }

    async fn get(&self, _id: &str) -> Result<Option<Message>, CoreError> {
        Err(CoreError::Storage)
    }

    async fn mark_read(
        &self,
        _id: &str,
        _read_timestamp: u64,
    ) -> Result<Option<Message>, CoreError> {
        Err(CoreError::Storage)
    }
}

pub fn broken_core() -> Core {
    Core::new(test_config(), Arc::new(BrokenStore))
}
