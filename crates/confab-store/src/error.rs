use confab_shared::ConversationId;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No document exists under the given id.
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),

    /// A create collided with an existing document id.
    #[error("Conversation already exists: {0}")]
    AlreadyExists(ConversationId),

    /// A group-only update was applied to a direct conversation.
    #[error("Conversation {0} is not a group")]
    NotAGroup(ConversationId),

    /// Generic I/O error from the object store.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The named object does not exist.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// An empty payload was handed to the object store.
    #[error("Refusing to store an empty object")]
    EmptyObject,

    /// The payload exceeds the configured size limit.
    #[error("Object too large: {size} bytes (max {max})")]
    ObjectTooLarge { size: usize, max: usize },

    /// A folder or object name tried to escape the storage root.
    #[error("Invalid object path: {0}")]
    InvalidObjectPath(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
