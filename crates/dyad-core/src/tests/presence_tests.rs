use super::{connection, drain, memory_core};
use dyad_api::events::ServerEvent;
use dyad_api::types::UserStatus;

fn statuses(events: &[ServerEvent]) -> Vec<(String, UserStatus)> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::UserStatus(notice) => {
                Some((notice.identity.clone(), notice.status))
            }
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn second_login_supersedes_the_first() {
    let core = memory_core();
    let (first, _rx_first) = connection();
    let (second, _rx_second) = connection();
    core.login("alice", first.clone()).await;
    core.login("alice", second.clone()).await;

    let current = core.registry().lookup("alice").await.expect("alice online");
    assert_eq!(current.id(), second.id());

    // The superseded connection going away must not flip alice offline.
    core.disconnect(first.id()).await;
    assert!(core.registry().is_online("alice").await);
}

#[tokio::test]
async fn login_broadcasts_and_replays_the_online_set() {
    let core = memory_core();
    let (alice, mut rx_alice) = connection();
    core.login("alice", alice).await;
    drain(&mut rx_alice);

    let (bob, mut rx_bob) = connection();
    core.login("bob", bob).await;

    let seen_by_alice = statuses(&drain(&mut rx_alice));
    assert!(seen_by_alice.contains(&("bob".to_string(), UserStatus::Online)));

    // The newcomer gets the broadcast plus a replay of who was already online.
    let seen_by_bob = statuses(&drain(&mut rx_bob));
    assert!(seen_by_bob.contains(&("bob".to_string(), UserStatus::Online)));
    assert!(seen_by_bob.contains(&("alice".to_string(), UserStatus::Online)));
}

#[tokio::test]
async fn disconnect_before_login_is_a_silent_noop() {
    let core = memory_core();
    let (alice, mut rx_alice) = connection();
    core.login("alice", alice).await;
    drain(&mut rx_alice);

    let (stray, _rx_stray) = connection();
    core.disconnect(stray.id()).await;

    assert!(core.registry().is_online("alice").await);
    assert!(drain(&mut rx_alice).is_empty());
}

#[tokio::test]
async fn disconnect_broadcasts_offline_and_status_checks_reach_everyone() {
    let core = memory_core();
    let (alice, _rx_alice) = connection();
    let (bob, mut rx_bob) = connection();
    core.login("alice", alice.clone()).await;
    core.login("bob", bob).await;
    drain(&mut rx_bob);

    core.disconnect(alice.id()).await;
    let after_disconnect = statuses(&drain(&mut rx_bob));
    assert!(after_disconnect.contains(&("alice".to_string(), UserStatus::Offline)));

    core.check_status("alice").await;
    let after_check = statuses(&drain(&mut rx_bob));
    assert_eq!(
        after_check,
        vec![("alice".to_string(), UserStatus::Offline)]
    );
}

#[tokio::test]
async fn empty_identity_registration_is_ignored() {
    let core = memory_core();
    let (handle, _rx) = connection();
    core.login("   ", handle).await;
    assert_eq!(core.registry().online_count().await, 0);
}
