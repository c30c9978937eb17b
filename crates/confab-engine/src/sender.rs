//! Message composition and optimistic send.
//!
//! A draft becomes a fully-populated message before anything is written:
//! media uploads first, then the append and the last-activity bump land in
//! one atomic batch. A failed upload therefore aborts the send with no
//! partial message visible to anyone.

use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use confab_shared::{ConversationId, IdentityId, IdentityRef, MediaKind, MessageId};
use confab_store::{
    ConversationStore, ConversationUpdate, DeliveryState, Message, MessageBody,
};

use crate::error::{EngineError, Result};
use crate::uploader::MediaUploader;

/// An outgoing message before composition.
#[derive(Debug, Clone)]
pub enum Draft {
    Text(String),
    Media { kind: MediaKind, bytes: Bytes },
}

#[derive(Clone)]
pub struct MessageSender {
    store: ConversationStore,
    uploader: MediaUploader,
}

impl MessageSender {
    pub fn new(store: ConversationStore, uploader: MediaUploader) -> Self {
        Self { store, uploader }
    }

    /// Compose and append a message, bumping the conversation's
    /// last-activity timestamp in the same atomic write.
    ///
    /// The sender identity is snapshotted into the message; later profile
    /// changes do not rewrite history. `delivery.sent` is set optimistically
    /// at append time.
    pub async fn send(
        &self,
        conversation_id: ConversationId,
        sender: &IdentityRef,
        draft: Draft,
    ) -> Result<Message> {
        let body = match draft {
            Draft::Text(text) => {
                if text.trim().is_empty() {
                    return Err(EngineError::EmptyDraft);
                }
                MessageBody::text(text)
            }
            Draft::Media { kind, bytes } => {
                // Upload before the message exists; a failure here aborts
                // the send with nothing appended.
                let url = self.uploader.upload(&bytes, kind).await?;
                match kind {
                    MediaKind::Image => MessageBody::image(url),
                    MediaKind::Video => MessageBody::video(url),
                    MediaKind::Audio => MessageBody::audio(url),
                }
            }
        };

        let message = Message {
            id: MessageId::new(),
            sent_at: Utc::now(),
            sender: sender.clone(),
            body,
            delivery: DeliveryState {
                sent: true,
                received: false,
            },
        };

        self.store
            .apply_all(
                conversation_id,
                vec![
                    ConversationUpdate::AppendMessages(vec![message.clone()]),
                    ConversationUpdate::SetLastActivity(message.sent_at),
                ],
            )
            .await?;

        info!(
            conversation = %conversation_id,
            message = %message.id,
            media = message.body.has_media(),
            "message sent"
        );
        Ok(message)
    }

    /// Best-effort typing flag, keyed by the sender's identity.
    ///
    /// Last write wins; this is a side channel with no delivery guarantee
    /// and is never part of the message log.
    pub async fn set_typing(
        &self,
        conversation_id: ConversationId,
        sender: &IdentityId,
        typing: bool,
    ) -> Result<()> {
        self.store
            .apply(
                conversation_id,
                ConversationUpdate::SetTyping {
                    member: sender.clone(),
                    typing,
                },
            )
            .await?;
        Ok(())
    }
}
