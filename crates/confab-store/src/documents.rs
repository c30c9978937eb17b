//! Conversation document store with field-scoped merge updates and
//! snapshot fan-out.
//!
//! Mutations go through [`ConversationUpdate`] variants so concurrent
//! writers touching different fields never clobber each other; there is no
//! whole-document replace. Subscribers receive full snapshots over a
//! `tokio::sync::broadcast` channel in emission order. Delivery is
//! at-least-once: a lagged receiver resyncs from the current document, so
//! consumers must be idempotent under duplicate snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use confab_shared::{ConversationId, IdentityId};

use crate::error::{Result, StoreError};
use crate::models::{AccessStamp, Conversation, Member, Message};

/// Capacity of the change fan-out channel. Slow subscribers past this many
/// pending events fall back to a snapshot resync.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Update and event types
// ---------------------------------------------------------------------------

/// A tagged, field-scoped mutation of one conversation document.
#[derive(Debug, Clone)]
pub enum ConversationUpdate {
    /// Union-append to the message log, keyed by message id. A message whose
    /// id is already present is skipped, never duplicated or overwritten.
    AppendMessages(Vec<Message>),
    /// Last-write-wins typing flag for one participant.
    SetTyping { member: IdentityId, typing: bool },
    /// Replace the roster. Used for soft-delete flips and member additions.
    SetMembers(Vec<Member>),
    /// Replace the admin list (groups only).
    SetAdmins(Vec<Member>),
    /// Rename the group (groups only).
    SetGroupName(String),
    /// Set the group avatar URL (groups only).
    SetGroupAvatar(String),
    /// Bump the last-activity timestamp.
    SetLastActivity(DateTime<Utc>),
    /// Stamp a participant's first/most recent open of the conversation.
    RecordAccess { member: IdentityId, at: DateTime<Utc> },
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// The document was created or mutated; carries the full snapshot.
    Updated(Conversation),
    /// The document was purged.
    Deleted(ConversationId),
}

impl DocumentEvent {
    fn conversation_id(&self) -> ConversationId {
        match self {
            Self::Updated(doc) => doc.id,
            Self::Deleted(id) => *id,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct Inner {
    docs: RwLock<HashMap<ConversationId, Conversation>>,
    events: broadcast::Sender<DocumentEvent>,
}

/// In-memory conversation document store.
///
/// Cloning is cheap; all clones share the same documents and event channel.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Inner>,
}

impl ConversationStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                docs: RwLock::new(HashMap::new()),
                events,
            }),
        }
    }

    /// Insert a new conversation document.
    pub async fn create(&self, doc: Conversation) -> Result<()> {
        let mut docs = self.inner.docs.write().await;
        if docs.contains_key(&doc.id) {
            return Err(StoreError::AlreadyExists(doc.id));
        }
        info!(id = %doc.id, group = doc.is_group(), "conversation created");
        self.emit(DocumentEvent::Updated(doc.clone()));
        docs.insert(doc.id, doc);
        Ok(())
    }

    /// Fetch a snapshot of a single conversation.
    pub async fn get(&self, id: ConversationId) -> Result<Conversation> {
        let docs = self.inner.docs.read().await;
        docs.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    /// Apply one field-scoped update. See [`ConversationStore::apply_all`].
    pub async fn apply(&self, id: ConversationId, update: ConversationUpdate) -> Result<Conversation> {
        self.apply_all(id, vec![update]).await
    }

    /// Apply a batch of field-scoped updates atomically.
    ///
    /// The whole batch mutates the document under one write lock and emits a
    /// single snapshot, so a message append paired with a last-activity bump
    /// reaches each subscriber as exactly one event.
    pub async fn apply_all(
        &self,
        id: ConversationId,
        updates: Vec<ConversationUpdate>,
    ) -> Result<Conversation> {
        let mut docs = self.inner.docs.write().await;
        let doc = docs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        for update in updates {
            apply_update(doc, update)?;
        }

        let snapshot = doc.clone();
        self.emit(DocumentEvent::Updated(snapshot.clone()));
        Ok(snapshot)
    }

    /// Delete a conversation document. Returns `true` if it existed.
    pub async fn delete(&self, id: ConversationId) -> Result<bool> {
        let mut docs = self.inner.docs.write().await;
        let existed = docs.remove(&id).is_some();
        if existed {
            info!(id = %id, "conversation purged");
            self.emit(DocumentEvent::Deleted(id));
        }
        Ok(existed)
    }

    /// Filter-predicate query: every conversation where `member` is on the
    /// roster with `removed == false`, newest activity first.
    ///
    /// An empty result is a valid terminal state, not an error.
    pub async fn list_for_member(&self, member: &IdentityId) -> Result<Vec<Conversation>> {
        let docs = self.inner.docs.read().await;
        let mut found: Vec<Conversation> = docs
            .values()
            .filter(|doc| doc.has_active_member(member))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(found)
    }

    /// Subscribe to one document's change stream.
    pub fn watch(&self, id: ConversationId) -> DocumentWatch {
        DocumentWatch {
            id,
            rx: self.inner.events.subscribe(),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Subscribe to roster-filtered changes: yields the member's current
    /// conversation list whenever any document changes.
    pub fn watch_member(&self, member: IdentityId) -> MemberWatch {
        MemberWatch {
            member,
            rx: self.inner.events.subscribe(),
            store: self.clone(),
        }
    }

    fn emit(&self, event: DocumentEvent) {
        // No receivers is fine; nobody is watching yet.
        let _ = self.inner.events.send(event);
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_update(doc: &mut Conversation, update: ConversationUpdate) -> Result<()> {
    match update {
        ConversationUpdate::AppendMessages(messages) => {
            for message in messages {
                if doc.messages.iter().any(|m| m.id == message.id) {
                    debug!(id = %doc.id, message_id = %message.id, "duplicate append skipped");
                    continue;
                }
                doc.messages.push(message);
            }
        }
        ConversationUpdate::SetTyping { member, typing } => {
            doc.typing.insert(member, typing);
        }
        ConversationUpdate::SetMembers(members) => {
            doc.members = members;
        }
        ConversationUpdate::SetAdmins(admins) => {
            let group = doc.group.as_mut().ok_or(StoreError::NotAGroup(doc.id))?;
            group.admins = admins;
        }
        ConversationUpdate::SetGroupName(name) => {
            let group = doc.group.as_mut().ok_or(StoreError::NotAGroup(doc.id))?;
            group.name = name;
        }
        ConversationUpdate::SetGroupAvatar(url) => {
            let group = doc.group.as_mut().ok_or(StoreError::NotAGroup(doc.id))?;
            group.avatar_url = url;
        }
        ConversationUpdate::SetLastActivity(at) => {
            doc.last_activity_at = at;
        }
        ConversationUpdate::RecordAccess { member, at } => {
            match doc.last_access.iter_mut().find(|s| s.identity_id == member) {
                Some(stamp) => stamp.opened_at = Some(at),
                None => doc.last_access.push(AccessStamp {
                    identity_id: member,
                    opened_at: Some(at),
                }),
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Watches
// ---------------------------------------------------------------------------

/// Change stream for a single conversation document.
pub struct DocumentWatch {
    id: ConversationId,
    rx: broadcast::Receiver<DocumentEvent>,
    inner: Arc<Inner>,
}

impl DocumentWatch {
    pub fn conversation_id(&self) -> ConversationId {
        self.id
    }

    /// Wait for the next change to this document.
    ///
    /// Returns `None` once the store itself is gone. A lagged receiver skips
    /// the missed events and resyncs from the current snapshot.
    pub async fn changed(&mut self) -> Option<DocumentEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.conversation_id() == self.id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(id = %self.id, skipped, "watch lagged, resyncing from snapshot");
                    let docs = self.inner.docs.read().await;
                    return match docs.get(&self.id) {
                        Some(doc) => Some(DocumentEvent::Updated(doc.clone())),
                        None => Some(DocumentEvent::Deleted(self.id)),
                    };
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Change stream filtered by roster membership.
///
/// Yields the member's full active conversation list after every store
/// change; consumers diff against their previous list.
pub struct MemberWatch {
    member: IdentityId,
    rx: broadcast::Receiver<DocumentEvent>,
    store: ConversationStore,
}

impl MemberWatch {
    /// Wait for any store change and return the refreshed conversation list.
    pub async fn changed(&mut self) -> Option<Vec<Conversation>> {
        loop {
            match self.rx.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    return self.store.list_for_member(&self.member).await.ok();
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
