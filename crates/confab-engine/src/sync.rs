//! Live sync channel: turns raw conversation document snapshots into the
//! ordered, de-duplicated view a chat screen consumes.
//!
//! The transport (the store's broadcast channel) delivers snapshots
//! at-least-once in emission order; the [`Materializer`] makes consumption
//! idempotent by diffing the ordered message id sequence, so a duplicate
//! snapshot never produces a second downstream update.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use confab_shared::{ConversationId, IdentityId, MessageId};
use confab_store::{Conversation, ConversationStore, DocumentEvent, Message};

/// Buffered views per subscription before back-pressure applies.
const VIEW_CHANNEL_CAPACITY: usize = 32;

/// Materialized state of one conversation, ready to render.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationView {
    pub conversation_id: ConversationId,
    /// Newest first. Media fields inside each body carry explicit empty
    /// markers, never absence.
    pub messages: Vec<Message>,
    /// OR over all participants' typing flags, excluding the viewer.
    pub anyone_typing: bool,
}

/// Stateful snapshot-to-view transformer for a single viewer.
pub struct Materializer {
    viewer: IdentityId,
    last_ids: Vec<MessageId>,
    last_typing: Option<bool>,
}

impl Materializer {
    pub fn new(viewer: IdentityId) -> Self {
        Self {
            viewer,
            last_ids: Vec::new(),
            last_typing: None,
        }
    }

    /// Convert a document snapshot into a view.
    ///
    /// Returns `None` when the ordered message id sequence and the derived
    /// typing state both match the previously emitted view: the redundant
    /// re-render is suppressed.
    pub fn materialize(&mut self, doc: &Conversation) -> Option<ConversationView> {
        let mut messages = doc.messages.clone();
        // Newest first; concurrent writers may interleave arbitrarily, so a
        // consistent order is imposed here, not at write time. Message id
        // breaks sent_at ties deterministically.
        messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));

        let ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();
        let anyone_typing = doc
            .typing
            .iter()
            .any(|(id, typing)| *typing && id != &self.viewer);

        if ids == self.last_ids && self.last_typing == Some(anyone_typing) {
            debug!(id = %doc.id, "unchanged snapshot suppressed");
            return None;
        }

        self.last_ids = ids;
        self.last_typing = Some(anyone_typing);

        Some(ConversationView {
            conversation_id: doc.id,
            messages,
            anyone_typing,
        })
    }
}

/// Handle to a running subscription.
///
/// [`Subscription::unsubscribe`] is safe to call any number of times and
/// terminates in-flight delivery; dropping the view receiver ends the
/// delivery task as well.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        // Aborting an already-finished or already-aborted task is a no-op.
        self.task.abort();
    }
}

/// Attach to a conversation document and deliver materialized views.
///
/// The subscriber is primed with the current document state, then receives
/// a view for every effective remote change, in store-emission order.
pub fn subscribe(
    store: &ConversationStore,
    conversation_id: ConversationId,
    viewer: IdentityId,
) -> (mpsc::Receiver<ConversationView>, Subscription) {
    let (tx, rx) = mpsc::channel(VIEW_CHANNEL_CAPACITY);

    // Register the watch before the priming read so changes in between are
    // not lost; the materializer swallows the resulting duplicate.
    let mut watch = store.watch(conversation_id);
    let store = store.clone();

    let task = tokio::spawn(async move {
        let mut materializer = Materializer::new(viewer);

        if let Ok(doc) = store.get(conversation_id).await {
            if let Some(view) = materializer.materialize(&doc) {
                if tx.send(view).await.is_err() {
                    return;
                }
            }
        }

        loop {
            match watch.changed().await {
                Some(DocumentEvent::Updated(doc)) => {
                    if let Some(view) = materializer.materialize(&doc) {
                        if tx.send(view).await.is_err() {
                            break;
                        }
                    }
                }
                Some(DocumentEvent::Deleted(_)) | None => break,
            }
        }
    });

    (rx, Subscription { task })
}
