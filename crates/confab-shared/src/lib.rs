//! Types shared by every Confab crate: identity references and the opaque
//! id newtypes used to key conversations, messages and media objects.

pub mod identity;
pub mod types;

pub use identity::{IdentityId, IdentityRef};
pub use types::{ConversationId, MediaKind, MessageId};
