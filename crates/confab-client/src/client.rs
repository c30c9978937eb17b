//! Session-aware facade over the store and the engine.
//!
//! Every operation checks for a signed-in identity first and fails with
//! [`ClientError::NoIdentity`] instead of panicking when the session is
//! missing.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use confab_engine::{
    new_direct, resolve, subscribe, ConversationView, Draft, MediaUploader,
    MembershipManager, MembershipOutcome, MessageSender, Resolution, Subscription,
};
use confab_shared::{ConversationId, IdentityId, IdentityRef, MediaKind};
use confab_store::{
    Conversation, ConversationStore, ConversationUpdate, Message, ObjectStore,
};

use crate::error::{ClientError, Result};
use crate::state::ClientState;
use crate::summary::{summarize, ConversationSummary};

#[derive(Clone)]
pub struct ChatClient {
    state: Arc<Mutex<ClientState>>,
    store: ConversationStore,
    uploader: MediaUploader,
    sender: MessageSender,
    membership: MembershipManager,
}

impl ChatClient {
    pub fn new(store: ConversationStore, objects: ObjectStore) -> Self {
        let uploader = MediaUploader::new(objects);
        Self {
            state: Arc::new(Mutex::new(ClientState::new())),
            sender: MessageSender::new(store.clone(), uploader.clone()),
            membership: MembershipManager::new(store.clone()),
            store,
            uploader,
        }
    }

    // --- Session -----------------------------------------------------------

    pub async fn sign_in(&self, identity: IdentityRef) {
        info!(id = %identity.id, "signed in");
        self.state.lock().await.identity = Some(identity);
    }

    pub async fn sign_out(&self) {
        let mut guard = self.state.lock().await;
        if let Some(identity) = guard.identity.take() {
            info!(id = %identity.id, "signed out");
        }
    }

    async fn current(&self) -> Result<IdentityRef> {
        self.state
            .lock()
            .await
            .identity
            .clone()
            .ok_or(ClientError::NoIdentity)
    }

    // --- Conversations -----------------------------------------------------

    /// Open (or create) the direct conversation with `target` and stamp the
    /// access time. Returns the conversation to navigate to.
    pub async fn open_chat_with(&self, target: &IdentityRef) -> Result<Conversation> {
        let me = self.current().await?;
        let known = self.store.list_for_member(&me.id).await?;

        let id = match resolve(&me, target, &known) {
            Resolution::ReuseSelf(id) | Resolution::Reuse(id) => id,
            Resolution::Create => {
                let doc = new_direct(&me, target, Utc::now());
                let id = doc.id;
                self.store.create(doc).await?;
                info!(id = %id, target = %target.id, "direct conversation created");
                return self.store.get(id).await.map_err(Into::into);
            }
        };

        let doc = self
            .store
            .apply(
                id,
                ConversationUpdate::RecordAccess {
                    member: me.id.clone(),
                    at: Utc::now(),
                },
            )
            .await?;
        Ok(doc)
    }

    /// Record that the viewer opened `id`, clearing its unread marker.
    pub async fn mark_opened(&self, id: ConversationId) -> Result<()> {
        let me = self.current().await?;
        self.store
            .apply(
                id,
                ConversationUpdate::RecordAccess {
                    member: me.id,
                    at: Utc::now(),
                },
            )
            .await?;
        Ok(())
    }

    /// Display summaries for the chat list, most recent activity first.
    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>> {
        let me = self.current().await?;
        let known = self.store.list_for_member(&me.id).await?;
        Ok(known.iter().map(|doc| summarize(doc, &me.id)).collect())
    }

    /// Soft-delete the viewer from each selected conversation, purging the
    /// ones every member has abandoned. Returns how many were purged.
    pub async fn delete_chats(&self, ids: &[ConversationId]) -> Result<usize> {
        let me = self.current().await?;
        let mut purged = 0;
        for id in ids {
            if self.membership.leave(*id, &me.id).await? {
                purged += 1;
            }
        }
        info!(selected = ids.len(), purged, "chats deleted");
        Ok(purged)
    }

    /// Live view stream for one conversation, primed with current state.
    pub async fn subscribe_to(
        &self,
        id: ConversationId,
    ) -> Result<(mpsc::Receiver<ConversationView>, Subscription)> {
        let me = self.current().await?;
        Ok(subscribe(&self.store, id, me.id))
    }

    // --- Messaging ---------------------------------------------------------

    pub async fn send_text(&self, id: ConversationId, text: impl Into<String>) -> Result<Message> {
        let me = self.current().await?;
        let message = self.sender.send(id, &me, Draft::Text(text.into())).await?;
        Ok(message)
    }

    pub async fn send_media(
        &self,
        id: ConversationId,
        kind: MediaKind,
        bytes: Bytes,
    ) -> Result<Message> {
        let me = self.current().await?;
        let message = self
            .sender
            .send(id, &me, Draft::Media { kind, bytes })
            .await?;
        Ok(message)
    }

    pub async fn set_typing(&self, id: ConversationId, typing: bool) -> Result<()> {
        let me = self.current().await?;
        self.sender.set_typing(id, &me.id, typing).await?;
        Ok(())
    }

    // --- Groups ------------------------------------------------------------

    pub async fn create_group(
        &self,
        invitees: &[IdentityRef],
        name: &str,
    ) -> Result<Conversation> {
        let me = self.current().await?;
        let doc = self.membership.create_group(&me, invitees, name).await?;
        Ok(doc)
    }

    pub async fn add_member(
        &self,
        group_id: ConversationId,
        candidate: &IdentityRef,
    ) -> Result<MembershipOutcome> {
        self.current().await?;
        let outcome = self.membership.add_member(group_id, candidate).await?;
        Ok(outcome)
    }

    pub async fn remove_members(
        &self,
        group_id: ConversationId,
        selected: &[IdentityId],
    ) -> Result<usize> {
        self.current().await?;
        let removed = self.membership.remove_members(group_id, selected).await?;
        Ok(removed)
    }

    pub async fn promote_admin(
        &self,
        group_id: ConversationId,
        member_id: &IdentityId,
    ) -> Result<MembershipOutcome> {
        self.current().await?;
        let outcome = self.membership.promote_admin(group_id, member_id).await?;
        Ok(outcome)
    }

    pub async fn rename_group(&self, group_id: ConversationId, name: &str) -> Result<()> {
        self.current().await?;
        self.membership.rename_group(group_id, name).await?;
        Ok(())
    }

    /// Upload a new group avatar image and point the group at it.
    pub async fn set_group_avatar(
        &self,
        group_id: ConversationId,
        image: Bytes,
    ) -> Result<String> {
        self.current().await?;
        let url = self.uploader.upload_group_avatar(&image).await?;
        self.membership.set_group_avatar(group_id, &url).await?;
        Ok(url)
    }

    // --- Account -----------------------------------------------------------

    /// Drop every stored media object. Part of the account-deletion flow;
    /// conversation documents are untouched.
    pub async fn delete_account_media(&self) -> Result<()> {
        self.current().await?;
        self.uploader.purge_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_store::StoreConfig;
    use tempfile::TempDir;

    fn identity(id: &str, name: &str) -> IdentityRef {
        IdentityRef::new(id, name, "")
    }

    async fn test_client() -> (ChatClient, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            media_root: dir.path().to_path_buf(),
            media_base_url: "confab://media".to_string(),
            max_media_size: 1024,
        };
        let objects = ObjectStore::open(&config).await.unwrap();
        (ChatClient::new(ConversationStore::new(), objects), dir)
    }

    #[tokio::test]
    async fn operations_require_a_session() {
        let (client, _dir) = test_client().await;
        let target = identity("b", "Blaise");

        assert!(matches!(
            client.open_chat_with(&target).await,
            Err(ClientError::NoIdentity)
        ));
        assert!(matches!(
            client.conversations().await,
            Err(ClientError::NoIdentity)
        ));
    }

    #[tokio::test]
    async fn sign_out_ends_the_session() {
        let (client, _dir) = test_client().await;
        client.sign_in(identity("a", "Ada")).await;
        assert!(client.conversations().await.is_ok());

        client.sign_out().await;
        assert!(matches!(
            client.conversations().await,
            Err(ClientError::NoIdentity)
        ));
        // Idempotent.
        client.sign_out().await;
    }

    #[tokio::test]
    async fn open_chat_is_reused_not_duplicated() {
        let (client, _dir) = test_client().await;
        client.sign_in(identity("a", "Ada")).await;
        let target = identity("b", "Blaise");

        let first = client.open_chat_with(&target).await.unwrap();
        let second = client.open_chat_with(&target).await.unwrap();
        assert_eq!(first.id, second.id);

        let summaries = client.conversations().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, "Blaise");
    }

    #[tokio::test]
    async fn self_chat_resolves_to_itself() {
        let (client, _dir) = test_client().await;
        let me = identity("a", "Ada");
        client.sign_in(me.clone()).await;

        let first = client.open_chat_with(&me).await.unwrap();
        let second = client.open_chat_with(&me).await.unwrap();
        assert_eq!(first.id, second.id);

        let summaries = client.conversations().await.unwrap();
        assert_eq!(summaries[0].title, "Ada (You)");
    }

    #[tokio::test]
    async fn delete_chats_purges_abandoned_directs() {
        let (client, _dir) = test_client().await;
        client.sign_in(identity("a", "Ada")).await;

        let chat = client.open_chat_with(&identity("b", "Blaise")).await.unwrap();
        // B never opened the chat, so A leaving does not purge it yet.
        assert_eq!(client.delete_chats(&[chat.id]).await.unwrap(), 0);
        assert!(client.conversations().await.unwrap().is_empty());

        // A self-chat abandoned by its only participant is purged outright.
        let me = identity("a", "Ada");
        let solo = client.open_chat_with(&me).await.unwrap();
        assert_eq!(client.delete_chats(&[solo.id]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn group_avatar_flows_through_the_uploader() {
        let (client, _dir) = test_client().await;
        client.sign_in(identity("a", "Ada")).await;

        let group = client
            .create_group(&[identity("b", "Blaise")], "Trip")
            .await
            .unwrap();
        let url = client
            .set_group_avatar(group.id, Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert!(url.starts_with("confab://media/group_images/"));

        let summaries = client.conversations().await.unwrap();
        assert_eq!(summaries[0].avatar_url, url);
    }
}
