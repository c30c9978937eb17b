//! Domain model structs held in the conversation document store.
//!
//! Every struct derives `Serialize` and `Deserialize` so snapshots can be
//! handed directly to a UI layer over IPC.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use confab_shared::{ConversationId, IdentityId, IdentityRef, MessageId};

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// One participant's entry in a conversation roster.
///
/// Display name and avatar are copied from the identity at join time so a
/// removed member still renders correctly against historical messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub identity_id: IdentityId,
    pub display_name: String,
    pub avatar_url: String,
    /// Soft-delete marker. A removed member's record is kept for message
    /// attribution; only the flag flips.
    pub removed: bool,
    /// Meaningful for group rosters only; direct chats leave it false.
    #[serde(default)]
    pub is_admin: bool,
}

impl Member {
    /// Snapshot an identity into an active, non-admin membership record.
    pub fn from_identity(identity: &IdentityRef) -> Self {
        Self {
            identity_id: identity.id.clone(),
            display_name: identity.display_name.clone(),
            avatar_url: identity.avatar_url.clone(),
            removed: false,
            is_admin: false,
        }
    }

    /// Snapshot an identity into an active admin record.
    pub fn admin_from_identity(identity: &IdentityRef) -> Self {
        Self {
            is_admin: true,
            ..Self::from_identity(identity)
        }
    }
}

/// Per-participant record of when a direct conversation was last opened.
///
/// `opened_at` stays `None` until the participant first opens the
/// conversation; the creating side is stamped immediately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessStamp {
    pub identity_id: IdentityId,
    pub opened_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Payload of a message. Exactly one field is populated; the others hold
/// the explicit empty marker so rendering code never branches on presence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageBody {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub video: String,
    #[serde(default)]
    pub audio: String,
}

impl MessageBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self {
            image: url.into(),
            ..Self::default()
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self {
            video: url.into(),
            ..Self::default()
        }
    }

    pub fn audio(url: impl Into<String>) -> Self {
        Self {
            audio: url.into(),
            ..Self::default()
        }
    }

    /// True when any media reference is populated.
    pub fn has_media(&self) -> bool {
        !self.image.is_empty() || !self.video.is_empty() || !self.audio.is_empty()
    }
}

/// Write-path delivery markers. The send path sets `sent` at append time;
/// `received` is reserved and never advanced past creation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryState {
    pub sent: bool,
    pub received: bool,
}

/// A single chat message as stored in the conversation document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Client-generated id, unique per conversation.
    pub id: MessageId,
    /// When the sender composed the message.
    pub sent_at: DateTime<Utc>,
    /// Denormalized sender snapshot taken at send time.
    pub sender: IdentityRef,
    pub body: MessageBody,
    pub delivery: DeliveryState,
}

// ---------------------------------------------------------------------------
// Conversation document
// ---------------------------------------------------------------------------

/// Group-only profile fields. Presence of this struct is what makes a
/// conversation a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupProfile {
    pub name: String,
    /// Empty string when no group image has been set.
    #[serde(default)]
    pub avatar_url: String,
    /// Duplicated subset of the roster with `is_admin == true`. Entries are
    /// not pruned when the underlying member is soft-removed.
    pub admins: Vec<Member>,
}

/// The mutable, append-mostly remote record behind one conversation.
///
/// Direct chats carry exactly two roster entries (both slots may hold the
/// same identity for a "message yourself" chat); groups additionally carry
/// a [`GroupProfile`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub members: Vec<Member>,
    /// Physically unordered; ordering happens at materialization time.
    pub messages: Vec<Message>,
    pub last_activity_at: DateTime<Utc>,
    /// Best-effort, last-write-wins typing flags keyed by identity.
    #[serde(default)]
    pub typing: HashMap<IdentityId, bool>,
    /// Direct chats only; empty for groups.
    #[serde(default)]
    pub last_access: Vec<AccessStamp>,
    pub group: Option<GroupProfile>,
}

impl Conversation {
    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    /// Roster entry for the given identity, removed or not.
    pub fn member(&self, id: &IdentityId) -> Option<&Member> {
        self.members.iter().find(|m| &m.identity_id == id)
    }

    /// True when the identity is on the roster with `removed == false`.
    pub fn has_active_member(&self, id: &IdentityId) -> bool {
        self.members
            .iter()
            .any(|m| &m.identity_id == id && !m.removed)
    }

    /// Number of roster slots (active or removed) held by the identity.
    /// Two slots for the same identity marks a self-chat.
    pub fn slots_for(&self, id: &IdentityId) -> usize {
        self.members.iter().filter(|m| &m.identity_id == id).count()
    }

    /// True once every member has been soft-removed. Direct conversations
    /// in this state are purged by the caller.
    pub fn fully_removed(&self) -> bool {
        !self.members.is_empty() && self.members.iter().all(|m| m.removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> Member {
        Member::from_identity(&IdentityRef::new(id, id, ""))
    }

    #[test]
    fn body_markers_default_empty() {
        let body = MessageBody::image("confab://media/images/abc");
        assert_eq!(body.text, "");
        assert_eq!(body.video, "");
        assert_eq!(body.audio, "");
        assert!(body.has_media());
        assert!(!MessageBody::text("hi").has_media());
    }

    #[test]
    fn snapshot_without_optional_fields_deserializes() {
        // Documents written before typing, access stamps and admin flags
        // existed carry none of those fields; defaults must fill them in.
        let json = serde_json::json!({
            "id": ConversationId::new(),
            "members": [{
                "identity_id": "a",
                "display_name": "User a",
                "avatar_url": "",
                "removed": false
            }],
            "messages": [],
            "last_activity_at": Utc::now(),
            "group": null
        });

        let convo: Conversation = serde_json::from_value(json).unwrap();
        assert!(convo.typing.is_empty());
        assert!(convo.last_access.is_empty());
        assert!(!convo.members[0].is_admin);
    }

    #[test]
    fn self_chat_holds_two_slots() {
        let convo = Conversation {
            id: ConversationId::new(),
            members: vec![member("a"), member("a")],
            messages: vec![],
            last_activity_at: Utc::now(),
            typing: HashMap::new(),
            last_access: vec![],
            group: None,
        };
        assert_eq!(convo.slots_for(&IdentityId::from("a")), 2);
        assert!(!convo.fully_removed());
    }

    #[test]
    fn fully_removed_requires_every_member() {
        let mut convo = Conversation {
            id: ConversationId::new(),
            members: vec![member("a"), member("b")],
            messages: vec![],
            last_activity_at: Utc::now(),
            typing: HashMap::new(),
            last_access: vec![],
            group: None,
        };
        convo.members[0].removed = true;
        assert!(!convo.fully_removed());
        convo.members[1].removed = true;
        assert!(convo.fully_removed());
    }
}
