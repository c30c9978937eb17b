use confab_shared::{ConversationId, IdentityId};
use confab_store::StoreError;
use thiserror::Error;

/// Errors produced by the engine.
///
/// Every variant is recoverable at the call site: a failed round trip never
/// invalidates the subscription or the conversation itself.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A store round trip failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A draft with neither text nor media was handed to the sender.
    #[error("Draft has no content")]
    EmptyDraft,

    /// Group names must be non-empty.
    #[error("Group name cannot be empty")]
    EmptyGroupName,

    /// A group operation targeted a direct conversation.
    #[error("Conversation {0} is not a group")]
    NotAGroup(ConversationId),

    /// The identity is not an active member of the conversation.
    #[error("{identity} is not an active member of {conversation}")]
    NotAMember {
        conversation: ConversationId,
        identity: IdentityId,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
