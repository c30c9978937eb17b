//! End-to-end flows across two sessions sharing one store: conversation
//! resolution, cross-participant delivery and group membership.

use std::time::Duration;

use bytes::Bytes;

use confab_client::ChatClient;
use confab_shared::{IdentityId, IdentityRef, MediaKind};
use confab_store::{ConversationStore, ObjectStore, StoreConfig};
use tempfile::TempDir;

fn identity(id: &str, name: &str) -> IdentityRef {
    IdentityRef::new(id, name, format!("https://avatars/{id}"))
}

async fn two_clients() -> (ChatClient, ChatClient, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        media_root: dir.path().to_path_buf(),
        media_base_url: "confab://media".to_string(),
        max_media_size: 1024,
    };
    let objects = ObjectStore::open(&config).await.unwrap();
    let store = ConversationStore::new();

    let alice = ChatClient::new(store.clone(), objects.clone());
    let bob = ChatClient::new(store, objects);
    alice.sign_in(identity("alice", "Alice Carroll")).await;
    bob.sign_in(identity("bob", "Bob Dylan")).await;
    (alice, bob, dir)
}

#[tokio::test]
async fn image_send_reaches_the_other_participant_once() {
    let (alice, bob, _dir) = two_clients().await;

    // Alice opens a fresh conversation with Bob and Bob starts watching it.
    let chat = alice
        .open_chat_with(&identity("bob", "Bob Dylan"))
        .await
        .unwrap();
    let (mut views, subscription) = bob.subscribe_to(chat.id).await.unwrap();

    let primed = views.recv().await.unwrap();
    assert!(primed.messages.is_empty());

    let sent = alice
        .send_media(chat.id, MediaKind::Image, Bytes::from_static(b"jpeg"))
        .await
        .unwrap();
    assert!(sent.body.image.starts_with("confab://media/uploads/images/"));

    // Bob sees exactly one update for the send: append and activity bump
    // land in a single snapshot.
    let view = views.recv().await.unwrap();
    assert_eq!(view.messages.len(), 1);
    assert_eq!(view.messages[0].id, sent.id);
    assert_eq!(view.messages[0].sender.display_name, "Alice Carroll");

    let extra = tokio::time::timeout(Duration::from_millis(50), views.recv()).await;
    assert!(extra.is_err(), "one send must yield one view");

    // Bob's chat list: titled after Alice, unread, media preview.
    let summaries = bob.conversations().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title, "Alice Carroll");
    assert_eq!(summaries[0].subtitle, "Alice: sent an image");
    assert!(summaries[0].unread);

    // Opening the chat clears the marker.
    bob.mark_opened(chat.id).await.unwrap();
    let summaries = bob.conversations().await.unwrap();
    assert!(!summaries[0].unread);

    subscription.unsubscribe();
}

#[tokio::test]
async fn typing_indicator_crosses_sessions() {
    let (alice, bob, _dir) = two_clients().await;

    let chat = alice
        .open_chat_with(&identity("bob", "Bob Dylan"))
        .await
        .unwrap();
    let (mut views, _subscription) = bob.subscribe_to(chat.id).await.unwrap();
    let _ = views.recv().await.unwrap();

    alice.set_typing(chat.id, true).await.unwrap();
    let view = views.recv().await.unwrap();
    assert!(view.anyone_typing);

    alice.set_typing(chat.id, false).await.unwrap();
    let view = views.recv().await.unwrap();
    assert!(!view.anyone_typing);
}

#[tokio::test]
async fn both_sides_resolve_to_the_same_conversation() {
    let (alice, bob, _dir) = two_clients().await;

    let from_alice = alice
        .open_chat_with(&identity("bob", "Bob Dylan"))
        .await
        .unwrap();
    let from_bob = bob
        .open_chat_with(&identity("alice", "Alice Carroll"))
        .await
        .unwrap();

    assert_eq!(from_alice.id, from_bob.id);
    assert_eq!(alice.conversations().await.unwrap().len(), 1);
    assert_eq!(bob.conversations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn group_membership_round_trip() {
    let (alice, bob, _dir) = two_clients().await;

    let group = alice
        .create_group(
            &[identity("bob", "Bob Dylan"), identity("carol", "Carol King")],
            "Trip",
        )
        .await
        .unwrap();

    // Bob sees the group in his list under its name.
    let summaries = bob.conversations().await.unwrap();
    assert_eq!(summaries[0].title, "Trip");

    // Removing Bob hides the group from him without erasing his record.
    let bob_id = IdentityId::from("bob");
    alice.remove_members(group.id, &[bob_id.clone()]).await.unwrap();
    assert!(bob.conversations().await.unwrap().is_empty());

    // Messages Bob sent earlier would still attribute to his record;
    // re-adding restores the same membership.
    alice
        .add_member(group.id, &identity("bob", "Bob Dylan"))
        .await
        .unwrap();
    let summaries = bob.conversations().await.unwrap();
    assert_eq!(summaries.len(), 1);

    // Group messages flow like direct ones.
    alice.send_text(group.id, "meet at nine").await.unwrap();
    let summaries = bob.conversations().await.unwrap();
    assert_eq!(summaries[0].subtitle, "meet at nine");
}
