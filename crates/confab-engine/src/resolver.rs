//! Decides whether a direct conversation between two identities already
//! exists and must be reused rather than duplicated.
//!
//! Resolution is pure and read-only: it scans an already-fetched candidate
//! set and returns a decision. Nothing is persisted until the caller acts
//! on [`Resolution::Create`].

use chrono::{DateTime, Utc};
use tracing::debug;

use confab_shared::{ConversationId, IdentityRef};
use confab_store::{AccessStamp, Conversation, Member};

/// Outcome of resolving a target identity against known conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Reuse the "message yourself" conversation.
    ReuseSelf(ConversationId),
    /// Reuse the existing pair conversation.
    Reuse(ConversationId),
    /// No candidate matched; the caller creates a fresh document.
    Create,
}

/// Scan `known` (conversations where `current` is an active member) for a
/// direct chat to reuse with `target`.
///
/// A candidate holding two roster slots for `target` is the self-chat and
/// wins outright. Otherwise the first candidate containing both `current`
/// and `target` as distinct identities is reused; more than one such match
/// should not occur, but if it does the first wins. Groups never match.
pub fn resolve(
    current: &IdentityRef,
    target: &IdentityRef,
    known: &[Conversation],
) -> Resolution {
    let mut reuse = None;

    for candidate in known.iter().filter(|c| !c.is_group()) {
        // Self-chat: the target identity fills both slots. Takes precedence
        // over any pair match, including the degenerate target == current.
        if candidate.slots_for(&target.id) == 2 {
            debug!(id = %candidate.id, "resolved to self-chat");
            return Resolution::ReuseSelf(candidate.id);
        }

        if target.id != current.id
            && reuse.is_none()
            && candidate.has_active_member(&current.id)
            && candidate.member(&target.id).is_some()
        {
            reuse = Some(candidate.id);
        }
    }

    match reuse {
        Some(id) => {
            debug!(id = %id, "resolved to existing pair conversation");
            Resolution::Reuse(id)
        }
        None => Resolution::Create,
    }
}

/// Build the document for a fresh direct conversation.
///
/// The creating side's access stamp is set to `now`; the target's stays
/// unset until they first open the conversation. When `target == current`
/// this degenerates to a two-slot self-chat, which is intended.
pub fn new_direct(
    current: &IdentityRef,
    target: &IdentityRef,
    now: DateTime<Utc>,
) -> Conversation {
    Conversation {
        id: ConversationId::new(),
        members: vec![
            Member::from_identity(current),
            Member::from_identity(target),
        ],
        messages: Vec::new(),
        last_activity_at: now,
        typing: Default::default(),
        last_access: vec![
            AccessStamp {
                identity_id: current.id.clone(),
                opened_at: Some(now),
            },
            AccessStamp {
                identity_id: target.id.clone(),
                opened_at: None,
            },
        ],
        group: None,
    }
}
