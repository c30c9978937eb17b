//! Display summaries for the conversation list.
//!
//! Everything a list row needs is denormalized here so the UI layer never
//! touches raw documents: a title, an avatar, a one-line preview of the
//! latest message and an unread marker.

use chrono::{DateTime, Utc};
use serde::Serialize;

use confab_shared::{ConversationId, IdentityId};
use confab_store::{Conversation, Message};

/// Longest preview before the subtitle is cut with an ellipsis.
const SUBTITLE_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub title: String,
    pub avatar_url: String,
    pub subtitle: String,
    pub last_activity_at: DateTime<Utc>,
    pub unread: bool,
    pub is_group: bool,
}

/// Build the list row for `doc` as seen by `viewer`.
pub fn summarize(doc: &Conversation, viewer: &IdentityId) -> ConversationSummary {
    let (title, avatar_url) = title_and_avatar(doc, viewer);

    ConversationSummary {
        conversation_id: doc.id,
        title,
        avatar_url,
        subtitle: subtitle(doc, viewer),
        last_activity_at: doc.last_activity_at,
        unread: unread(doc, viewer),
        is_group: doc.is_group(),
    }
}

fn title_and_avatar(doc: &Conversation, viewer: &IdentityId) -> (String, String) {
    if let Some(group) = &doc.group {
        return (group.name.clone(), group.avatar_url.clone());
    }

    // The other roster slot; in a self-chat both slots belong to the viewer.
    match doc.members.iter().find(|m| &m.identity_id != viewer) {
        Some(peer) => (peer.display_name.clone(), peer.avatar_url.clone()),
        None => match doc.members.first() {
            Some(own) => (format!("{} (You)", own.display_name), own.avatar_url.clone()),
            None => (String::new(), String::new()),
        },
    }
}

fn subtitle(doc: &Conversation, viewer: &IdentityId) -> String {
    let latest = doc
        .messages
        .iter()
        .max_by(|a, b| a.sent_at.cmp(&b.sent_at).then(a.id.cmp(&b.id)));

    let Some(message) = latest else {
        return "No messages yet".to_string();
    };

    let mine = &message.sender.id == viewer;
    if let Some(kind) = media_noun(message) {
        let who = if mine {
            "You".to_string()
        } else {
            first_name(&message.sender.display_name)
        };
        return format!("{who}: sent {kind}");
    }

    let text = truncate(&message.body.text);
    if mine {
        format!("You: {text}")
    } else {
        text
    }
}

fn media_noun(message: &Message) -> Option<&'static str> {
    if !message.body.image.is_empty() {
        Some("an image")
    } else if !message.body.video.is_empty() {
        Some("a video")
    } else if !message.body.audio.is_empty() {
        Some("an audio")
    } else {
        None
    }
}

fn first_name(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .next()
        .unwrap_or(display_name)
        .to_string()
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= SUBTITLE_MAX_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SUBTITLE_MAX_CHARS).collect();
    format!("{}…", cut.trim_end())
}

fn unread(doc: &Conversation, viewer: &IdentityId) -> bool {
    if doc.is_group() {
        // Access stamps are only tracked for direct chats.
        return false;
    }
    match doc
        .last_access
        .iter()
        .find(|stamp| &stamp.identity_id == viewer)
    {
        // Never opened; anything in the log is news.
        Some(stamp) => match stamp.opened_at {
            None => !doc.messages.is_empty(),
            Some(opened_at) => opened_at < doc.last_activity_at,
        },
        None => false,
    }
}
