use super::{connection, drain, memory_core, test_config};
use crate::store::MemoryStore;
use crate::Core;
use dyad_api::events::ServerEvent;
use dyad_api::types::TypingSignal;
use std::sync::Arc;

fn typing(sender: &str, recipient: &str, is_typing: bool) -> TypingSignal {
    TypingSignal {
        sender: sender.to_string(),
        recipient: recipient.to_string(),
        is_typing,
    }
}

fn typing_notices(events: &[ServerEvent]) -> Vec<(String, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::UserTyping(notice) => Some((notice.sender.clone(), notice.is_typing)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn typing_is_relayed_to_the_recipient_only() {
    let core = memory_core();
    let (alice, mut rx_alice) = connection();
    let (bob, mut rx_bob) = connection();
    core.login("alice", alice).await;
    core.login("bob", bob).await;
    drain(&mut rx_alice);
    drain(&mut rx_bob);

    core.typing(typing("alice", "bob", true)).await;
    core.typing(typing("alice", "bob", false)).await;

    assert_eq!(
        typing_notices(&drain(&mut rx_bob)),
        vec![("alice".to_string(), true), ("alice".to_string(), false)]
    );
    assert!(typing_notices(&drain(&mut rx_alice)).is_empty());
}

#[tokio::test]
async fn typing_for_an_offline_recipient_is_dropped() {
    let core = memory_core();
    let (alice, mut rx_alice) = connection();
    core.login("alice", alice).await;
    drain(&mut rx_alice);

    core.typing(typing("alice", "bob", true)).await;
    assert!(typing_notices(&drain(&mut rx_alice)).is_empty());
}

#[tokio::test]
async fn typing_relay_can_be_disabled() {
    let config = crate::config::CoreConfig {
        enable_typing: false,
        ..test_config()
    };
    let core = Core::new(config, Arc::new(MemoryStore::new()));
    let (bob, mut rx_bob) = connection();
    core.login("bob", bob).await;
    drain(&mut rx_bob);

    core.typing(typing("alice", "bob", true)).await;
    assert!(typing_notices(&drain(&mut rx_bob)).is_empty());
}
